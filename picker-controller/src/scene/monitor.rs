use super::{AllowedCollisionMatrix, PlanningSceneDiff};
use crate::robot_description::RobotDescription;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Local copy of the scene that tracks what was changed since it was seeded.
#[derive(Debug, Clone)]
pub struct PlanningScene {
    allowed_collision_matrix: AllowedCollisionMatrix,
    acm_modified: bool,
}

impl PlanningScene {
    pub fn new(allowed_collision_matrix: AllowedCollisionMatrix) -> Self {
        Self {
            allowed_collision_matrix,
            acm_modified: false,
        }
    }

    pub fn allowed_collision_matrix(&self) -> &AllowedCollisionMatrix {
        &self.allowed_collision_matrix
    }

    pub fn allowed_collision_matrix_mut(&mut self) -> &mut AllowedCollisionMatrix {
        self.acm_modified = true;
        &mut self.allowed_collision_matrix
    }

    /// Everything modified since the scene was seeded or last cleared
    pub fn diff(&self) -> PlanningSceneDiff {
        PlanningSceneDiff {
            is_diff: true,
            allowed_collision_matrix: self
                .acm_modified
                .then(|| self.allowed_collision_matrix.clone()),
            ..Default::default()
        }
    }

    pub fn clear_diffs(&mut self) {
        self.acm_modified = false;
    }
}

pub struct LockedPlanningSceneRw<'a> {
    guard: RwLockWriteGuard<'a, PlanningScene>,
}

impl Deref for LockedPlanningSceneRw<'_> {
    type Target = PlanningScene;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for LockedPlanningSceneRw<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

pub struct LockedPlanningSceneRo<'a> {
    guard: RwLockReadGuard<'a, PlanningScene>,
}

impl Deref for LockedPlanningSceneRo<'_> {
    type Target = PlanningScene;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

#[derive(Clone)]
pub struct PlanningSceneMonitor {
    scene: Arc<RwLock<PlanningScene>>,
}

impl PlanningSceneMonitor {
    /// Seeds the scene with the pairs the robot description never checks
    pub fn new(description: &RobotDescription) -> Self {
        let matrix = AllowedCollisionMatrix::from_allowed_pairs(
            description
                .disabled_collisions
                .iter()
                .map(|pair| (pair.first.as_str(), pair.second.as_str())),
        );
        Self {
            scene: Arc::new(RwLock::new(PlanningScene::new(matrix))),
        }
    }

    pub async fn lock_scene_rw(&self) -> LockedPlanningSceneRw<'_> {
        LockedPlanningSceneRw {
            guard: self.scene.write().await,
        }
    }

    pub async fn lock_scene_ro(&self) -> LockedPlanningSceneRo<'_> {
        LockedPlanningSceneRo {
            guard: self.scene.read().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell_config::CellConfig;

    #[tokio::test]
    async fn untouched_scene_has_no_matrix_in_diff() {
        let config = CellConfig::included().unwrap();
        let monitor = PlanningSceneMonitor::new(&config.robot);
        let scene = monitor.lock_scene_ro().await;
        assert!(scene.diff().is_empty());
        assert!(scene.diff().is_diff);
    }

    #[tokio::test]
    async fn seeded_with_disabled_collisions() {
        let config = CellConfig::included().unwrap();
        let monitor = PlanningSceneMonitor::new(&config.robot);
        let scene = monitor.lock_scene_ro().await;
        let pair = &config.robot.disabled_collisions[0];
        assert!(scene
            .allowed_collision_matrix()
            .is_allowed(&pair.first, &pair.second));
    }

    #[tokio::test]
    async fn edit_shows_up_in_diff() {
        let config = CellConfig::included().unwrap();
        let monitor = PlanningSceneMonitor::new(&config.robot);
        let diff = {
            let mut scene = monitor.lock_scene_rw().await;
            scene
                .allowed_collision_matrix_mut()
                .set_entry("blue_box", "finger", true);
            scene.diff()
        };
        let matrix = diff.allowed_collision_matrix.unwrap();
        assert!(matrix.is_allowed("finger", "blue_box"));
    }

    #[tokio::test]
    async fn write_lock_is_released_on_drop() {
        let config = CellConfig::included().unwrap();
        let monitor = PlanningSceneMonitor::new(&config.robot);
        {
            let mut scene = monitor.lock_scene_rw().await;
            scene
                .allowed_collision_matrix_mut()
                .set_entry("a", "b", true);
        }
        let mut scene = monitor.lock_scene_rw().await;
        scene.clear_diffs();
        assert!(scene.diff().is_empty());
        assert!(scene.allowed_collision_matrix().is_allowed("a", "b"));
    }
}
