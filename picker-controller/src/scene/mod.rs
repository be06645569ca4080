mod collision_matrix;
mod monitor;

pub use collision_matrix::AllowedCollisionMatrix;
pub use monitor::{LockedPlanningSceneRo, LockedPlanningSceneRw, PlanningScene, PlanningSceneMonitor};

use crate::move_group::Pose;
use async_trait::async_trait;
use nalgebra as na;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("object {0:?} is not in the scene")]
    UnknownObject(String),
    #[error("link {0:?} is not part of the robot")]
    UnknownLink(String),
    #[error("object {0:?} has no geometry")]
    EmptyObject(String),
    #[error("scene service unavailable: {0}")]
    Transport(String),
}

type Result<T> = std::result::Result<T, SceneError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SolidPrimitive {
    /// Full edge lengths along x, y and z
    Box { dimensions: na::Vector3<f32> },
}

impl SolidPrimitive {
    pub fn cuboid(x: f32, y: f32, z: f32) -> Self {
        SolidPrimitive::Box {
            dimensions: na::Vector3::new(x, y, z),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOperation {
    Add,
    Remove,
    Move,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionObject {
    pub id: String,
    pub frame_id: String,
    pub primitives: Vec<(SolidPrimitive, Pose)>,
    pub operation: ObjectOperation,
}

impl CollisionObject {
    pub fn new(id: impl Into<String>, frame_id: impl Into<String>) -> Self {
        CollisionObject {
            id: id.into(),
            frame_id: frame_id.into(),
            primitives: vec![],
            operation: ObjectOperation::Add,
        }
    }

    pub fn with_primitive(mut self, primitive: SolidPrimitive, pose: Pose) -> Self {
        self.primitives.push((primitive, pose));
        self
    }

    pub fn with_operation(mut self, operation: ObjectOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Pose of the first primitive, which is what a single box object is placed by
    pub fn pose(&self) -> Option<&Pose> {
        self.primitives.first().map(|(_, pose)| pose)
    }
}

/// Object bound to a robot link so it moves with it
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedCollisionObject {
    pub link_name: String,
    pub object: CollisionObject,
    /// Links besides `link_name` that may touch the object
    pub touch_links: Vec<String>,
}

impl AttachedCollisionObject {
    pub fn new(link_name: impl Into<String>, object: CollisionObject) -> Self {
        AttachedCollisionObject {
            link_name: link_name.into(),
            object,
            touch_links: vec![],
        }
    }

    pub fn with_touch_link(mut self, link: impl Into<String>) -> Self {
        self.touch_links.push(link.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanningSceneDiff {
    pub is_diff: bool,
    pub allowed_collision_matrix: Option<AllowedCollisionMatrix>,
    pub world: Vec<CollisionObject>,
    pub attached: Vec<AttachedCollisionObject>,
}

impl PlanningSceneDiff {
    pub fn is_empty(&self) -> bool {
        self.allowed_collision_matrix.is_none() && self.world.is_empty() && self.attached.is_empty()
    }
}

/// Edits of the shared scene owned by the external service.
#[async_trait]
pub trait PlanningSceneInterface: Send + Sync {
    async fn apply_collision_objects(&mut self, objects: &[CollisionObject]) -> Result<()>;
    async fn remove_collision_objects(&mut self, object_ids: &[String]) -> Result<()>;
    async fn apply_attached_collision_object(
        &mut self,
        object: AttachedCollisionObject,
    ) -> Result<()>;
    async fn apply_planning_scene(&mut self, diff: PlanningSceneDiff) -> Result<()>;
    async fn known_object_names(&self) -> Result<Vec<String>>;
    /// World objects by id, missing ids are skipped
    async fn objects(&self, object_ids: &[String]) -> Result<BTreeMap<String, CollisionObject>>;
    async fn attached_objects(
        &self,
        object_ids: &[String],
    ) -> Result<BTreeMap<String, AttachedCollisionObject>>;
}
