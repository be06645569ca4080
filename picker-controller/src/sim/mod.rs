//! In-process stand-in for the external motion and scene service.
//!
//! Plans are straight-line interpolations, collision checks only look at the tool
//! point, and execution just replays waypoints into the shared state. Good enough
//! for dry runs and tests of the choreography, not for driving hardware.

mod collision;
mod interpolation;
mod move_group;
mod scene_interface;
mod spinner;
mod world;

pub use collision::CollisionHandler;
pub use move_group::SimulatedMoveGroup;
pub use scene_interface::SimulatedSceneInterface;
pub use spinner::{Spinner, SpinnerError, SpinnerHandle};
pub use world::{AttachedBody, GroupState, SharedWorld, SimulatedWorld};

use crate::cell_config::{CellConfig, SimulationSettings};
use crate::move_group::MoveGroupError;
use crate::node::NodeOptions;
use crate::robot_description::RobotDescription;
use crate::scene::PlanningSceneMonitor;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct SimulatedCell {
    node: NodeOptions,
    description: Arc<RobotDescription>,
    settings: Arc<SimulationSettings>,
    collision_handler: Arc<CollisionHandler>,
    world: SharedWorld,
    spinner: Spinner,
}

impl SimulatedCell {
    /// Brings the service up and starts its state dispatcher.
    /// Has to be called from within a tokio runtime.
    pub fn init(node: NodeOptions, config: &CellConfig) -> Self {
        Self::new(node, config.robot.clone(), config.simulation.clone())
    }

    pub fn new(node: NodeOptions, description: RobotDescription, settings: SimulationSettings) -> Self {
        let world = Arc::new(Mutex::new(SimulatedWorld::new(&description, &settings)));
        let spinner = Spinner::start(world.clone(), settings.waypoint_delay());
        tracing::info!(node = %node, robot = %description.name, "Simulated motion service up");
        Self {
            node,
            collision_handler: Arc::new(CollisionHandler::new(&settings)),
            description: Arc::new(description),
            settings: Arc::new(settings),
            world,
            spinner,
        }
    }

    pub fn move_group(&self, name: &str) -> Result<SimulatedMoveGroup, MoveGroupError> {
        SimulatedMoveGroup::new(
            name,
            self.description.clone(),
            self.settings.clone(),
            self.collision_handler.clone(),
            self.world.clone(),
            self.spinner.handle(),
        )
    }

    pub fn scene_interface(&self) -> SimulatedSceneInterface {
        SimulatedSceneInterface::new(self.world.clone())
    }

    pub fn scene_monitor(&self) -> PlanningSceneMonitor {
        PlanningSceneMonitor::new(&self.description)
    }

    /// Direct access to the simulated state, for inspection
    pub fn world(&self) -> SharedWorld {
        self.world.clone()
    }

    pub async fn shutdown(self) -> Result<(), SpinnerError> {
        tracing::info!(node = %self.node, "Shutting down simulated motion service");
        self.spinner.shutdown().await
    }
}
