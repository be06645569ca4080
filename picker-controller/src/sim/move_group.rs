use super::collision::CollisionHandler;
use super::interpolation::{cartesian_path, joint_path};
use super::spinner::SpinnerHandle;
use super::world::{GroupState, SharedWorld};
use crate::cell_config::SimulationSettings;
use crate::move_group::{
    JointValues, MoveGroup, MoveGroupError, MoveItErrorCode, MoveTarget, Plan, Pose, PoseStamped,
    Waypoint,
};
use crate::robot_description::{GroupDescription, RobotDescription};
use async_trait::async_trait;
use nalgebra as na;
use std::sync::Arc;
use std::time::Instant;

type Result<T> = std::result::Result<T, MoveGroupError>;

/// Joint values closer than this count as the same named state
const NAMED_STATE_TOLERANCE: f32 = 1.0e-4;

pub struct SimulatedMoveGroup {
    group: GroupDescription,
    description: Arc<RobotDescription>,
    settings: Arc<SimulationSettings>,
    collision_handler: Arc<CollisionHandler>,
    world: SharedWorld,
    spinner: SpinnerHandle,
    target: Option<MoveTarget>,
}

impl SimulatedMoveGroup {
    pub(super) fn new(
        name: &str,
        description: Arc<RobotDescription>,
        settings: Arc<SimulationSettings>,
        collision_handler: Arc<CollisionHandler>,
        world: SharedWorld,
        spinner: SpinnerHandle,
    ) -> Result<Self> {
        let group = description
            .group(name)
            .cloned()
            .ok_or_else(|| MoveGroupError::UnknownGroup(name.to_owned()))?;
        Ok(Self {
            group,
            description,
            settings,
            collision_handler,
            world,
            spinner,
            target: None,
        })
    }

    /// End effector pose of the named state matching `joints`, if there is one
    fn named_state_pose(&self, joints: &JointValues) -> Option<Pose> {
        self.group.named_states.values().find_map(|state| {
            let matches = self
                .group
                .joints
                .iter()
                .zip(state.joints.iter())
                .all(|(joint, value)| {
                    joints
                        .get(joint)
                        .map(|current| (current - value).abs() < NAMED_STATE_TOLERANCE)
                        .unwrap_or(false)
                });
            if matches {
                state.end_effector.clone()
            } else {
                None
            }
        })
    }

    fn plan_joint_target(&self, state: &GroupState, values: &JointValues) -> Vec<Waypoint> {
        let mut goal = state.joints.clone();
        goal.extend(values.iter().map(|(joint, value)| (joint.clone(), *value)));
        let final_pose = self
            .group
            .end_effector_link
            .as_ref()
            .and_then(|_| self.named_state_pose(&goal).or_else(|| state.end_effector.clone()));
        let mut trajectory: Vec<Waypoint> = joint_path(&state.joints, &goal, self.settings.joint_step)
            .into_iter()
            .map(|joints| Waypoint {
                joints,
                end_effector: None,
            })
            .collect();
        if let Some(last) = trajectory.last_mut() {
            last.end_effector = final_pose;
        }
        trajectory
    }
}

#[async_trait]
impl MoveGroup for SimulatedMoveGroup {
    fn name(&self) -> &str {
        &self.group.name
    }

    fn planning_frame(&self) -> &str {
        &self.description.planning_frame
    }

    fn end_effector_link(&self) -> Option<&str> {
        self.group.end_effector_link.as_deref()
    }

    fn joint_model_group_names(&self) -> Vec<String> {
        self.description.group_names()
    }

    fn named_target_values(&self, name: &str) -> Result<JointValues> {
        self.group
            .named_target_values(name)
            .ok_or_else(|| MoveGroupError::UnknownNamedTarget {
                group: self.group.name.clone(),
                target: name.to_owned(),
            })
    }

    async fn current_pose(&self, link: &str) -> Result<PoseStamped> {
        let world = self.world.lock().await;
        if !world.has_link(link) {
            return Err(MoveGroupError::UnknownLink(link.to_owned()));
        }
        let pose = world
            .link_pose(link)
            .ok_or_else(|| MoveGroupError::LinkPoseUnavailable(link.to_owned()))?;
        Ok(PoseStamped::new(
            self.description.planning_frame.clone(),
            Pose::from_isometry(&pose),
        ))
    }

    fn set_joint_value_target(&mut self, target: JointValues) -> Result<()> {
        if let Some(joint) = target.keys().find(|joint| !self.group.has_joint(joint)) {
            return Err(MoveGroupError::UnknownJoint {
                group: self.group.name.clone(),
                joint: joint.clone(),
            });
        }
        self.target = Some(MoveTarget::Joints(target));
        Ok(())
    }

    fn set_pose_target(&mut self, target: Pose) -> Result<()> {
        if self.group.end_effector_link.is_none() {
            return Err(MoveGroupError::NoEndEffector(self.group.name.clone()));
        }
        self.target = Some(MoveTarget::Pose(target));
        Ok(())
    }

    async fn plan(&mut self) -> Result<Plan> {
        let started = Instant::now();
        let target = self
            .target
            .clone()
            .ok_or(MoveGroupError::Planning(MoveItErrorCode::InvalidGoalConstraints))?;
        let world = self.world.lock().await;
        let state = world
            .groups
            .get(&self.group.name)
            .ok_or(MoveGroupError::Planning(MoveItErrorCode::InvalidGroupName))?;

        let trajectory = match &target {
            MoveTarget::Joints(values) => self.plan_joint_target(state, values),
            MoveTarget::Pose(pose) => {
                if !self
                    .collision_handler
                    .point_in_workspace(&na::Point3::from(pose.position))
                {
                    tracing::debug!(group = %self.group.name, "Target outside of reach");
                    return Err(MoveGroupError::Planning(MoveItErrorCode::NoIkSolution));
                }
                let start = state
                    .end_effector
                    .as_ref()
                    .ok_or(MoveGroupError::Planning(MoveItErrorCode::NoIkSolution))?;
                let link = self.group.end_effector_link.as_deref().unwrap_or_default();
                let path = cartesian_path(start, pose, self.settings.waypoint_spacing);
                for waypoint in &path {
                    if let Some(object) =
                        self.collision_handler
                            .colliding_object(waypoint, link, &world)
                    {
                        tracing::debug!(group = %self.group.name, object, "Path runs into object");
                        return Err(MoveGroupError::Planning(MoveItErrorCode::GoalInCollision));
                    }
                }
                path.into_iter()
                    .map(|pose| Waypoint {
                        joints: state.joints.clone(),
                        end_effector: Some(pose),
                    })
                    .collect()
            }
        };

        Ok(Plan {
            group: self.group.name.clone(),
            trajectory,
            planning_time: started.elapsed(),
        })
    }

    async fn move_to_target(&mut self) -> Result<MoveItErrorCode> {
        let plan = match self.plan().await {
            Ok(plan) => plan,
            Err(MoveGroupError::Planning(code)) => {
                tracing::debug!(group = %self.group.name, %code, "Refusing to execute");
                return Ok(code);
            }
            Err(error) => return Err(error),
        };
        self.spinner
            .execute(&self.group.name, plan.trajectory)
            .await
            .map_err(|error| MoveGroupError::Transport(error.to_string()))?;
        Ok(MoveItErrorCode::Success)
    }
}

#[cfg(test)]
mod tests {
    use crate::cell_config::CellConfig;
    use crate::move_group::{MoveGroup, MoveGroupError, MoveItErrorCode, Pose};
    use crate::node::NodeOptions;
    use crate::scene::{CollisionObject, PlanningSceneInterface, SolidPrimitive};
    use crate::sim::SimulatedCell;
    use approx::assert_relative_eq;
    use nalgebra as na;

    fn cell() -> (CellConfig, SimulatedCell) {
        let config = CellConfig::included().unwrap();
        let cell = SimulatedCell::init(NodeOptions::default(), &config);
        (config, cell)
    }

    fn down(position: na::Vector3<f32>) -> Pose {
        Pose::new(
            position,
            na::UnitQuaternion::from_euler_angles(0.0, std::f32::consts::FRAC_PI_2, 0.0),
        )
    }

    #[tokio::test]
    async fn lists_every_group() {
        let (_, cell) = cell();
        let arm = cell.move_group("ur5_arm").unwrap();
        assert_eq!(arm.joint_model_group_names(), vec!["ur5_arm", "gripper"]);
        assert_eq!(arm.planning_frame(), "world");
        assert_eq!(arm.end_effector_link(), Some("ee_link"));
        cell.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_group_is_rejected() {
        let (_, cell) = cell();
        assert!(matches!(
            cell.move_group("left_arm"),
            Err(MoveGroupError::UnknownGroup(_))
        ));
        cell.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn plan_without_target_fails() {
        let (_, cell) = cell();
        let mut arm = cell.move_group("ur5_arm").unwrap();
        assert!(matches!(
            arm.plan().await,
            Err(MoveGroupError::Planning(
                MoveItErrorCode::InvalidGoalConstraints
            ))
        ));
        cell.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn named_joint_target_moves_end_effector() {
        let (_, cell) = cell();
        let mut arm = cell.move_group("ur5_arm").unwrap();
        let home = arm.named_target_values("home").unwrap();
        arm.set_joint_value_target(home.clone()).unwrap();
        let code = arm.move_to_target().await.unwrap();
        assert_eq!(code, MoveItErrorCode::Success);

        let pose = arm.current_pose("ee_link").await.unwrap();
        assert_eq!(pose.frame_id, "world");
        assert_relative_eq!(pose.pose.position, na::Vector3::new(0.11, 0.49, 0.43));
        let world = cell.world();
        let world = world.lock().await;
        assert_relative_eq!(
            world.groups["ur5_arm"].joints["elbow_joint"],
            home["elbow_joint"]
        );
        drop(world);
        cell.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn gripper_has_no_pose_target() {
        let (_, cell) = cell();
        let mut gripper = cell.move_group("gripper").unwrap();
        assert!(matches!(
            gripper.set_pose_target(Pose::default()),
            Err(MoveGroupError::NoEndEffector(_))
        ));
        assert!(matches!(
            gripper.named_target_values("half"),
            Err(MoveGroupError::UnknownNamedTarget { .. })
        ));
        cell.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn joint_target_rejects_foreign_joint() {
        let (_, cell) = cell();
        let mut gripper = cell.move_group("gripper").unwrap();
        let mut values = gripper.named_target_values("open").unwrap();
        values.insert("elbow_joint".to_owned(), 0.0);
        assert!(matches!(
            gripper.set_joint_value_target(values),
            Err(MoveGroupError::UnknownJoint { .. })
        ));
        cell.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_pose_is_not_executed() {
        let (_, cell) = cell();
        let mut arm = cell.move_group("ur5_arm").unwrap();
        let before = arm.current_pose("ee_link").await.unwrap();
        arm.set_pose_target(down(na::Vector3::new(1.5, 0.0, 0.2)))
            .unwrap();
        assert!(matches!(
            arm.plan().await,
            Err(MoveGroupError::Planning(MoveItErrorCode::NoIkSolution))
        ));
        assert_eq!(
            arm.move_to_target().await.unwrap(),
            MoveItErrorCode::NoIkSolution
        );
        let after = arm.current_pose("ee_link").await.unwrap();
        assert_eq!(before, after);
        cell.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn descending_into_box_needs_permission() {
        let (config, cell) = cell();
        let mut scene = cell.scene_interface();
        let object = CollisionObject::new("blue_box", "world").with_primitive(
            SolidPrimitive::cuboid(0.06, 0.06, 0.06),
            Pose::from_position(config.object.position),
        );
        scene.apply_collision_objects(&[object]).await.unwrap();

        let mut arm = cell.move_group("ur5_arm").unwrap();
        arm.set_pose_target(down(na::Vector3::new(0.3, 0.5, 0.2)))
            .unwrap();
        assert_eq!(arm.move_to_target().await.unwrap(), MoveItErrorCode::Success);

        arm.set_pose_target(down(na::Vector3::new(0.3, 0.5, 0.0)))
            .unwrap();
        assert_eq!(
            arm.move_to_target().await.unwrap(),
            MoveItErrorCode::GoalInCollision
        );

        {
            let world = cell.world();
            let mut world = world.lock().await;
            world
                .allowed_collisions
                .set_entry("blue_box", &config.grasp.left_finger_link, true);
            world
                .allowed_collisions
                .set_entry("blue_box", &config.grasp.right_finger_link, true);
        }
        assert_eq!(arm.move_to_target().await.unwrap(), MoveItErrorCode::Success);
        let pose = arm.current_pose("ee_link").await.unwrap();
        assert_relative_eq!(pose.pose.position, na::Vector3::new(0.3, 0.5, 0.0));
        cell.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn untracked_link_has_no_pose() {
        let (_, cell) = cell();
        let arm = cell.move_group("ur5_arm").unwrap();
        assert!(matches!(
            arm.current_pose("base_link").await,
            Err(MoveGroupError::LinkPoseUnavailable(_))
        ));
        assert!(matches!(
            arm.current_pose("tool0").await,
            Err(MoveGroupError::UnknownLink(_))
        ));
        cell.shutdown().await.unwrap();
    }
}
