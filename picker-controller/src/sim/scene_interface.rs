use super::world::{SharedWorld, SimulatedWorld};
use crate::scene::{
    AttachedCollisionObject, CollisionObject, ObjectOperation, PlanningSceneDiff,
    PlanningSceneInterface, SceneError,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

type Result<T> = std::result::Result<T, SceneError>;

pub struct SimulatedSceneInterface {
    world: SharedWorld,
}

impl SimulatedSceneInterface {
    pub(super) fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

fn apply_object(world: &mut SimulatedWorld, object: &CollisionObject) -> Result<()> {
    match object.operation {
        ObjectOperation::Add => {
            if object.primitives.is_empty() {
                return Err(SceneError::EmptyObject(object.id.clone()));
            }
            world.objects.insert(object.id.clone(), object.clone());
        }
        ObjectOperation::Remove => {
            if world.objects.remove(&object.id).is_none() {
                tracing::debug!("Nothing to remove for {}", object.id);
            }
        }
        ObjectOperation::Move => {
            let existing = world
                .objects
                .get_mut(&object.id)
                .ok_or_else(|| SceneError::UnknownObject(object.id.clone()))?;
            for ((_, pose), (_, new_pose)) in existing
                .primitives
                .iter_mut()
                .zip(object.primitives.iter())
            {
                *pose = new_pose.clone();
            }
        }
    }
    Ok(())
}

fn apply_attached(world: &mut SimulatedWorld, attached: AttachedCollisionObject) -> Result<()> {
    if !world.has_link(&attached.link_name) {
        return Err(SceneError::UnknownLink(attached.link_name));
    }
    let id = attached.object.id.clone();
    match attached.object.operation {
        ObjectOperation::Add | ObjectOperation::Move => {
            let mut attached = attached;
            // attaching by id alone takes the geometry from the world
            if attached.object.primitives.is_empty() {
                let existing = world
                    .objects
                    .get(&id)
                    .ok_or_else(|| SceneError::UnknownObject(id.clone()))?;
                attached.object.primitives = existing.primitives.clone();
                attached.object.frame_id = existing.frame_id.clone();
            }
            let link = attached.link_name.clone();
            world
                .attach(attached)
                .ok_or(SceneError::UnknownLink(link))?;
            world.objects.remove(&id);
        }
        ObjectOperation::Remove => {
            // detached objects stay in the world where they were let go
            let body = world
                .attached
                .remove(&id)
                .ok_or_else(|| SceneError::UnknownObject(id.clone()))?;
            let mut object = body.attached.object;
            object.operation = ObjectOperation::Add;
            world.objects.insert(id, object);
        }
    }
    Ok(())
}

#[async_trait]
impl PlanningSceneInterface for SimulatedSceneInterface {
    async fn apply_collision_objects(&mut self, objects: &[CollisionObject]) -> Result<()> {
        let mut world = self.world.lock().await;
        for object in objects {
            apply_object(&mut world, object)?;
        }
        Ok(())
    }

    async fn remove_collision_objects(&mut self, object_ids: &[String]) -> Result<()> {
        let mut world = self.world.lock().await;
        for id in object_ids {
            if world.objects.remove(id).is_none() {
                tracing::debug!("Nothing to remove for {}", id);
            }
        }
        Ok(())
    }

    async fn apply_attached_collision_object(
        &mut self,
        object: AttachedCollisionObject,
    ) -> Result<()> {
        let mut world = self.world.lock().await;
        apply_attached(&mut world, object)
    }

    async fn apply_planning_scene(&mut self, diff: PlanningSceneDiff) -> Result<()> {
        let mut world = self.world.lock().await;
        if !diff.is_diff {
            world.objects.clear();
            if let Some(matrix) = &diff.allowed_collision_matrix {
                world.allowed_collisions = matrix.clone();
            }
        } else if let Some(matrix) = &diff.allowed_collision_matrix {
            world.allowed_collisions.merge(matrix);
        }
        for object in &diff.world {
            apply_object(&mut world, object)?;
        }
        for attached in diff.attached {
            apply_attached(&mut world, attached)?;
        }
        Ok(())
    }

    async fn known_object_names(&self) -> Result<Vec<String>> {
        Ok(self.world.lock().await.objects.keys().cloned().collect())
    }

    async fn objects(&self, object_ids: &[String]) -> Result<BTreeMap<String, CollisionObject>> {
        let world = self.world.lock().await;
        Ok(object_ids
            .iter()
            .filter_map(|id| world.objects.get(id).map(|object| (id.clone(), object.clone())))
            .collect())
    }

    async fn attached_objects(
        &self,
        object_ids: &[String],
    ) -> Result<BTreeMap<String, AttachedCollisionObject>> {
        let world = self.world.lock().await;
        Ok(object_ids
            .iter()
            .filter_map(|id| {
                world
                    .attached
                    .get(id)
                    .map(|body| (id.clone(), body.attached.clone()))
            })
            .collect())
    }
}
