use crate::cell_config::SimulationSettings;
use crate::move_group::{JointValues, Pose, Waypoint};
use crate::robot_description::RobotDescription;
use crate::scene::{AllowedCollisionMatrix, AttachedCollisionObject, CollisionObject};
use nalgebra as na;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedWorld = Arc<Mutex<SimulatedWorld>>;

#[derive(Debug, Clone, PartialEq)]
pub struct GroupState {
    pub joints: JointValues,
    pub end_effector: Option<Pose>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachedBody {
    pub attached: AttachedCollisionObject,
    /// primitive poses relative to the link they hang on
    pub offsets: Vec<na::Isometry3<f32>>,
}

/// Everything the simulated service knows about the cell.
#[derive(Debug, Clone)]
pub struct SimulatedWorld {
    pub objects: BTreeMap<String, CollisionObject>,
    pub attached: BTreeMap<String, AttachedBody>,
    pub allowed_collisions: AllowedCollisionMatrix,
    pub groups: BTreeMap<String, GroupState>,
    links: BTreeSet<String>,
    end_effector_links: BTreeMap<String, String>,
    /// links rigidly mounted on the tool group end effector
    tool_links: BTreeSet<String>,
    tool_group: Option<String>,
}

impl SimulatedWorld {
    pub fn new(description: &RobotDescription, settings: &SimulationSettings) -> Self {
        let mut groups = BTreeMap::new();
        let mut end_effector_links = BTreeMap::new();
        for group in &description.groups {
            let default_state = group
                .default_state
                .as_ref()
                .and_then(|name| group.named_states.get(name));
            let joints = match default_state {
                Some(state) => group
                    .joints
                    .iter()
                    .cloned()
                    .zip(state.joints.iter().copied())
                    .collect(),
                None => group.joints.iter().map(|joint| (joint.clone(), 0.0)).collect(),
            };
            let end_effector = default_state.and_then(|state| state.end_effector.clone());
            groups.insert(
                group.name.clone(),
                GroupState {
                    joints,
                    end_effector,
                },
            );
            if let Some(link) = &group.end_effector_link {
                end_effector_links.insert(link.clone(), group.name.clone());
            }
        }
        let tool_group = description
            .groups
            .iter()
            .find(|group| group.end_effector_link.is_some())
            .map(|group| group.name.clone());
        let allowed_collisions = AllowedCollisionMatrix::from_allowed_pairs(
            description
                .disabled_collisions
                .iter()
                .map(|pair| (pair.first.as_str(), pair.second.as_str())),
        );
        Self {
            objects: BTreeMap::new(),
            attached: BTreeMap::new(),
            allowed_collisions,
            groups,
            links: description.links.iter().cloned().collect(),
            end_effector_links,
            tool_links: settings.tool_links.iter().cloned().collect(),
            tool_group,
        }
    }

    pub fn has_link(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    /// Only end effector links and the tool links mounted on them are tracked
    pub fn link_pose(&self, link: &str) -> Option<na::Isometry3<f32>> {
        let group = match self.end_effector_links.get(link) {
            Some(group) => group,
            None if self.tool_links.contains(link) => self.tool_group.as_ref()?,
            None => return None,
        };
        self.groups
            .get(group)?
            .end_effector
            .as_ref()
            .map(Pose::to_isometry)
    }

    pub fn attach(&mut self, attached: AttachedCollisionObject) -> Option<()> {
        let link_pose = self.link_pose(&attached.link_name)?;
        let link_inverse = link_pose.inverse();
        let offsets = attached
            .object
            .primitives
            .iter()
            .map(|(_, pose)| link_inverse * pose.to_isometry())
            .collect();
        let id = attached.object.id.clone();
        for link in std::iter::once(&attached.link_name).chain(attached.touch_links.iter()) {
            self.allowed_collisions.set_entry(&id, link, true);
        }
        self.attached.insert(id, AttachedBody { attached, offsets });
        Some(())
    }

    pub fn apply_waypoint(&mut self, group: &str, waypoint: &Waypoint) {
        let Some(state) = self.groups.get_mut(group) else {
            tracing::warn!("Dropping waypoint for unknown group {}", group);
            return;
        };
        state
            .joints
            .extend(waypoint.joints.iter().map(|(joint, value)| (joint.clone(), *value)));
        if let Some(pose) = &waypoint.end_effector {
            state.end_effector = Some(pose.clone());
            self.carry_attached_bodies();
        }
    }

    fn carry_attached_bodies(&mut self) {
        let link_poses: BTreeMap<String, na::Isometry3<f32>> = self
            .attached
            .values()
            .filter_map(|body| {
                let link = &body.attached.link_name;
                self.link_pose(link).map(|pose| (link.clone(), pose))
            })
            .collect();
        for body in self.attached.values_mut() {
            if let Some(link_pose) = link_poses.get(&body.attached.link_name) {
                for ((_, pose), offset) in body
                    .attached
                    .object
                    .primitives
                    .iter_mut()
                    .zip(body.offsets.iter())
                {
                    *pose = Pose::from_isometry(&(link_pose * offset));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell_config::CellConfig;
    use crate::scene::SolidPrimitive;
    use approx::assert_relative_eq;

    fn world() -> SimulatedWorld {
        let config = CellConfig::included().unwrap();
        SimulatedWorld::new(&config.robot, &config.simulation)
    }

    #[test]
    fn groups_start_in_default_state() {
        let world = world();
        let arm = &world.groups["ur5_arm"];
        assert_eq!(arm.joints.len(), 6);
        assert_relative_eq!(arm.joints["shoulder_lift_joint"], -1.5707);
        assert!(arm.end_effector.is_some());
        let gripper = &world.groups["gripper"];
        assert_relative_eq!(gripper.joints["robotiq_85_left_knuckle_joint"], 0.36);
        assert!(gripper.end_effector.is_none());
    }

    #[test]
    fn finger_links_follow_arm_end_effector() {
        let world = world();
        let finger = world
            .link_pose("robotiq_85_left_finger_tip_link")
            .unwrap();
        let end_effector = world.link_pose("ee_link").unwrap();
        assert_relative_eq!(finger.translation.vector, end_effector.translation.vector);
        assert!(world.link_pose("base_link").is_none());
    }

    #[test]
    fn attached_body_moves_with_end_effector() {
        let mut world = world();
        let start = world.link_pose("ee_link").unwrap();
        let box_pose = Pose::from_isometry(&(start * na::Translation3::new(0.1, 0.0, 0.0)));
        let object = CollisionObject::new("blue_box", "world")
            .with_primitive(SolidPrimitive::cuboid(0.06, 0.06, 0.06), box_pose);
        let attached = AttachedCollisionObject::new("robotiq_85_right_finger_tip_link", object)
            .with_touch_link("robotiq_85_left_finger_tip_link");
        world.attach(attached).unwrap();
        assert!(world
            .allowed_collisions
            .is_allowed("blue_box", "robotiq_85_left_finger_tip_link"));

        let mut moved = Pose::from_isometry(&start);
        moved.position.x -= 0.6;
        let waypoint = Waypoint {
            joints: JointValues::new(),
            end_effector: Some(moved.clone()),
        };
        world.apply_waypoint("ur5_arm", &waypoint);

        let carried = world.attached["blue_box"].attached.object.pose().unwrap();
        let expected = moved.to_isometry() * na::Translation3::new(0.1, 0.0, 0.0);
        assert_relative_eq!(carried.position, expected.translation.vector, epsilon = 1.0e-5);
    }

    #[test]
    fn attach_to_untracked_link_fails() {
        let mut world = world();
        let attached =
            AttachedCollisionObject::new("base_link", CollisionObject::new("blue_box", "world"));
        assert!(world.attach(attached).is_none());
        assert!(world.attached.is_empty());
    }
}
