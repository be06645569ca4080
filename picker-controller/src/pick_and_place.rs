use crate::cell_config::CellConfig;
use crate::move_group::{MoveGroup, MoveGroupError, MoveItErrorCode, MoveTarget, Pose};
use crate::scene::{
    AttachedCollisionObject, CollisionObject, PlanningSceneInterface, PlanningSceneMonitor,
    SceneError, SolidPrimitive,
};
use nalgebra as na;
use std::fmt;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PickPlaceError {
    #[error("motion service request failed")]
    MoveGroup(#[from] MoveGroupError),
    #[error("scene service request failed")]
    Scene(#[from] SceneError),
}

type Result<T> = std::result::Result<T, PickPlaceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Home,
    Approach,
    OpenGripper,
    Descend,
    CloseGripper,
    Transport,
    Lower,
    Release,
}

impl Step {
    pub fn number(self) -> u8 {
        match self {
            Step::Home => 1,
            Step::Approach => 2,
            Step::OpenGripper => 3,
            Step::Descend => 4,
            Step::CloseGripper => 5,
            Step::Transport => 6,
            Step::Lower => 7,
            Step::Release => 8,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Step::Home => "move to home position",
            Step::Approach => "place the tool above the object",
            Step::OpenGripper => "open the gripper",
            Step::Descend => "move the tool close to the object",
            Step::CloseGripper => "close the gripper",
            Step::Transport => "move the tool above the plate",
            Step::Lower => "lower the tool above the plate",
            Step::Release => "open the gripper",
        };
        write!(f, "{}. {}", self.number(), text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub step: Step,
    pub target_kind: &'static str,
    /// Informational only, the move was requested either way
    pub plan_succeeded: bool,
    pub execution: MoveItErrorCode,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    pub final_target: Option<Pose>,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.steps
            .iter()
            .all(|step| step.plan_succeeded && step.execution.is_success())
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|step| !step.plan_succeeded || !step.execution.is_success())
    }
}

/// Set target, plan, log the outcome and move no matter what the plan said.
async fn plan_and_move(
    group: &mut dyn MoveGroup,
    step: Step,
    target: MoveTarget,
) -> std::result::Result<StepReport, MoveGroupError> {
    info!("{}", step);
    let target_kind = target.kind();
    match target {
        MoveTarget::Joints(values) => group.set_joint_value_target(values)?,
        MoveTarget::Pose(pose) => group.set_pose_target(pose)?,
    }
    let plan_succeeded = match group.plan().await {
        Ok(plan) => {
            debug!(
                group = group.name(),
                waypoints = plan.trajectory.len(),
                "Planned in {:?}",
                plan.planning_time
            );
            true
        }
        Err(MoveGroupError::Planning(code)) => {
            debug!(group = group.name(), %code, "Planning failed");
            false
        }
        Err(error) => return Err(error),
    };
    info!(
        "Visualizing plan {} ({} goal) {}",
        step.number(),
        target_kind,
        if plan_succeeded { "ok" } else { "FAILED" }
    );
    let execution = group.move_to_target().await?;
    if !execution.is_success() {
        warn!(group = group.name(), %execution, "Motion for step {} did not succeed", step.number());
    }
    Ok(StepReport {
        step,
        target_kind,
        plan_succeeded,
        execution,
    })
}

/// The fixed pick and place choreography.
///
/// Every capability comes from the injected groups and scene service. Steps run in a
/// fixed order and nothing here reacts to planning or execution outcomes.
pub struct PickAndPlace {
    arm: Box<dyn MoveGroup>,
    gripper: Box<dyn MoveGroup>,
    scene: Box<dyn PlanningSceneInterface>,
    monitor: PlanningSceneMonitor,
    config: CellConfig,
}

impl PickAndPlace {
    pub fn new(
        arm: Box<dyn MoveGroup>,
        gripper: Box<dyn MoveGroup>,
        scene: Box<dyn PlanningSceneInterface>,
        monitor: PlanningSceneMonitor,
        config: CellConfig,
    ) -> Self {
        Self {
            arm,
            gripper,
            scene,
            monitor,
            config,
        }
    }

    pub async fn run(&mut self) -> Result<RunReport> {
        let object = self.add_object().await?;
        self.allow_gripper_collisions(&object.id).await?;
        info!(
            "Available Planning Groups: {}",
            self.arm.joint_model_group_names().join(", ")
        );

        let motion = self.config.motion.clone();
        let mut report = RunReport::default();

        let home = self.arm.named_target_values(&motion.home_target)?;
        report.steps.push(
            plan_and_move(self.arm.as_mut(), Step::Home, MoveTarget::Joints(home)).await?,
        );

        let current = self.arm.current_pose(&self.config.end_effector_link).await?;
        let object_position = self.config.object.position;
        let mut target = Pose::new(
            na::Vector3::new(object_position.x, object_position.y, motion.approach_height),
            current.pose.orientation,
        );
        report
            .steps
            .push(self.move_arm(Step::Approach, &target).await?);

        report
            .steps
            .push(self.move_gripper(Step::OpenGripper, &motion.open_target).await?);

        target.position.z -= motion.grasp_descent;
        report
            .steps
            .push(self.move_arm(Step::Descend, &target).await?);

        report
            .steps
            .push(self.move_gripper(Step::CloseGripper, &motion.closed_target).await?);

        self.attach_object(&object).await?;

        target.position.z += motion.lift_height;
        target.position.x += motion.transport_offset_x;
        report
            .steps
            .push(self.move_arm(Step::Transport, &target).await?);

        target.position.z -= motion.place_descent;
        report
            .steps
            .push(self.move_arm(Step::Lower, &target).await?);

        report
            .steps
            .push(self.move_gripper(Step::Release, &motion.open_target).await?);

        info!("Remove the object from the world");
        self.scene
            .remove_collision_objects(&[object.id.clone()])
            .await?;

        report.final_target = Some(target);
        Ok(report)
    }

    async fn add_object(&mut self) -> Result<CollisionObject> {
        let object_config = &self.config.object;
        let object = CollisionObject::new(object_config.id.clone(), self.arm.planning_frame())
            .with_primitive(
                SolidPrimitive::Box {
                    dimensions: object_config.dimensions,
                },
                Pose::from_position(object_config.position),
            );
        self.scene
            .apply_collision_objects(std::slice::from_ref(&object))
            .await?;
        info!("Add an object into the world");
        sleep(self.config.scene_settle()).await;
        Ok(object)
    }

    /// Holds the scene write lock only while editing and reading back the diff
    async fn allow_gripper_collisions(&mut self, object_id: &str) -> Result<()> {
        let diff = {
            let mut scene = self.monitor.lock_scene_rw().await;
            let matrix = scene.allowed_collision_matrix_mut();
            matrix.set_entry(object_id, &self.config.grasp.left_finger_link, true);
            matrix.set_entry(object_id, &self.config.grasp.right_finger_link, true);
            info!("AllowedCollisionMatrix:\n{}", scene.allowed_collision_matrix());
            scene.diff()
        };
        self.scene.apply_planning_scene(diff).await?;
        sleep(self.config.scene_settle()).await;
        Ok(())
    }

    async fn attach_object(&mut self, object: &CollisionObject) -> Result<()> {
        let grasp = &self.config.grasp;
        let attached = AttachedCollisionObject::new(
            grasp.right_finger_link.clone(),
            CollisionObject::new(object.id.clone(), object.frame_id.clone()),
        )
        .with_touch_link(grasp.left_finger_link.clone());
        self.scene.apply_attached_collision_object(attached).await?;
        debug!("Attached {} to {}", object.id, grasp.right_finger_link);
        Ok(())
    }

    async fn move_arm(&mut self, step: Step, target: &Pose) -> Result<StepReport> {
        let target = MoveTarget::Pose(target.clone());
        Ok(plan_and_move(self.arm.as_mut(), step, target).await?)
    }

    async fn move_gripper(&mut self, step: Step, named_target: &str) -> Result<StepReport> {
        let target = MoveTarget::Joints(self.gripper.named_target_values(named_target)?);
        Ok(plan_and_move(self.gripper.as_mut(), step, target).await?)
    }
}
