use async_trait::async_trait;
use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Joint name to joint position, radians or metres depending on the joint
pub type JointValues = BTreeMap<String, f32>;

#[derive(Error, Debug)]
pub enum MoveGroupError {
    #[error("planning failed with {0}")]
    Planning(MoveItErrorCode),
    #[error("group {group:?} has no named target {target:?}")]
    UnknownNamedTarget { group: String, target: String },
    #[error("joint {joint:?} is not part of group {group:?}")]
    UnknownJoint { group: String, joint: String },
    #[error("robot has no group {0:?}")]
    UnknownGroup(String),
    #[error("link {0:?} is not part of the robot")]
    UnknownLink(String),
    #[error("pose of link {0:?} is not available")]
    LinkPoseUnavailable(String),
    #[error("group {0:?} has no end effector to place")]
    NoEndEffector(String),
    #[error("motion service unavailable: {0}")]
    Transport(String),
}

type Result<T> = std::result::Result<T, MoveGroupError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: na::Vector3<f32>,
    pub orientation: na::UnitQuaternion<f32>,
}

impl Pose {
    pub fn new(position: na::Vector3<f32>, orientation: na::UnitQuaternion<f32>) -> Pose {
        Pose {
            position,
            orientation,
        }
    }

    /// Pose with identity orientation
    pub fn from_position(position: na::Vector3<f32>) -> Pose {
        Pose::new(position, na::UnitQuaternion::identity())
    }

    pub fn to_isometry(&self) -> na::Isometry3<f32> {
        na::Isometry3::from_parts(na::Translation3::from(self.position), self.orientation)
    }

    pub fn from_isometry(isometry: &na::Isometry3<f32>) -> Pose {
        Pose::new(isometry.translation.vector, isometry.rotation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::from_position(na::Vector3::zeros())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoseStamped {
    pub frame_id: String,
    pub pose: Pose,
}

impl PoseStamped {
    pub fn new(frame_id: impl Into<String>, pose: Pose) -> PoseStamped {
        PoseStamped {
            frame_id: frame_id.into(),
            pose,
        }
    }
}

/// Result codes reported by the motion service for planning and execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveItErrorCode {
    Success,
    PlanningFailed,
    InvalidGroupName,
    InvalidGoalConstraints,
    NoIkSolution,
    GoalInCollision,
    InvalidMotionPlan,
    ControlFailed,
    Timeout,
}

impl MoveItErrorCode {
    pub fn is_success(self) -> bool {
        self == MoveItErrorCode::Success
    }
}

impl fmt::Display for MoveItErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MoveItErrorCode::Success => "SUCCESS",
            MoveItErrorCode::PlanningFailed => "PLANNING_FAILED",
            MoveItErrorCode::InvalidGroupName => "INVALID_GROUP_NAME",
            MoveItErrorCode::InvalidGoalConstraints => "INVALID_GOAL_CONSTRAINTS",
            MoveItErrorCode::NoIkSolution => "NO_IK_SOLUTION",
            MoveItErrorCode::GoalInCollision => "GOAL_IN_COLLISION",
            MoveItErrorCode::InvalidMotionPlan => "INVALID_MOTION_PLAN",
            MoveItErrorCode::ControlFailed => "CONTROL_FAILED",
            MoveItErrorCode::Timeout => "TIMED_OUT",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveTarget {
    Joints(JointValues),
    Pose(Pose),
}

impl MoveTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            MoveTarget::Joints(_) => "joint",
            MoveTarget::Pose(_) => "pose",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub joints: JointValues,
    /// Tool pose at this waypoint, only known for groups with an end effector
    pub end_effector: Option<Pose>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub group: String,
    pub trajectory: Vec<Waypoint>,
    pub planning_time: Duration,
}

/// A named control group of the external motion service.
///
/// Setting a target only records it. `plan` asks the service for a plan to the
/// recorded target and `move_to_target` plans and executes in one blocking call.
#[async_trait]
pub trait MoveGroup: Send + Sync {
    fn name(&self) -> &str;
    fn planning_frame(&self) -> &str;
    fn end_effector_link(&self) -> Option<&str>;
    /// Every group declared by the robot, not only this one
    fn joint_model_group_names(&self) -> Vec<String>;
    fn named_target_values(&self, name: &str) -> Result<JointValues>;
    async fn current_pose(&self, link: &str) -> Result<PoseStamped>;
    fn set_joint_value_target(&mut self, target: JointValues) -> Result<()>;
    fn set_pose_target(&mut self, target: Pose) -> Result<()>;
    async fn plan(&mut self) -> Result<Plan>;
    /// `Ok` carries the service verdict. `Err` only when the service can't be reached.
    async fn move_to_target(&mut self) -> Result<MoveItErrorCode>;
}
