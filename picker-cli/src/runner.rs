use anyhow::Result;
use picker_controller::{
    cell_config::CellConfig,
    node::NodeOptions,
    pick_and_place::{PickAndPlace, RunReport},
    sim::SimulatedCell,
};

async fn pick_and_place(cell: &SimulatedCell, config: CellConfig) -> Result<RunReport> {
    let arm = cell.move_group(&config.arm_group)?;
    let gripper = cell.move_group(&config.gripper_group)?;
    let mut choreography = PickAndPlace::new(
        Box::new(arm),
        Box::new(gripper),
        Box::new(cell.scene_interface()),
        cell.scene_monitor(),
        config,
    );
    Ok(choreography.run().await?)
}

/// Runs the choreography against the simulated cell.
/// The cell is shut down whether the run finished or not.
pub async fn run_simulated(node: NodeOptions, config: CellConfig) -> Result<RunReport> {
    let cell = SimulatedCell::init(node, &config);
    let result = pick_and_place(&cell, config).await;
    let shutdown = cell.shutdown().await;
    let report = result?;
    shutdown?;
    Ok(report)
}
