use super::world::SimulatedWorld;
use crate::cell_config::SimulationSettings;
use crate::move_group::Pose;
use crate::scene::SolidPrimitive;
use nalgebra as na;
use parry3d::{query::PointQuery, shape};

pub struct CollisionHandler {
    workspace_sphere: shape::Ball,
    base: na::Vector3<f32>,
    tool_offset: na::Vector3<f32>,
    tool_links: Vec<String>,
}

impl CollisionHandler {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            workspace_sphere: shape::Ball::new(settings.reach_radius),
            base: settings.base_position,
            tool_offset: settings.tool_offset,
            tool_links: settings.tool_links.clone(),
        }
    }

    pub fn point_in_workspace(&self, point: &na::Point3<f32>) -> bool {
        self.workspace_sphere.contains_point(
            &na::Isometry3::translation(self.base.x, self.base.y, self.base.z),
            point,
        )
    }

    /// Point the tool links are checked at for a given end effector pose
    pub fn tool_point(&self, end_effector: &Pose) -> na::Point3<f32> {
        end_effector.to_isometry() * na::Point3::from(self.tool_offset)
    }

    /// First world object the tool point of `end_effector` is inside of.
    ///
    /// Objects the allowed collision matrix exempts against every tool link are skipped.
    /// Without configured tool links `end_effector_link` stands in for the tool.
    pub fn colliding_object<'a>(
        &self,
        end_effector: &Pose,
        end_effector_link: &str,
        world: &'a SimulatedWorld,
    ) -> Option<&'a str> {
        let point = self.tool_point(end_effector);
        let fallback = [end_effector_link.to_owned()];
        let tool_links: &[String] = if self.tool_links.is_empty() {
            &fallback
        } else {
            &self.tool_links
        };
        world
            .objects
            .values()
            .filter(|object| {
                !tool_links
                    .iter()
                    .all(|link| world.allowed_collisions.is_allowed(&object.id, link))
            })
            .find(|object| {
                object.primitives.iter().any(|(primitive, pose)| match primitive {
                    SolidPrimitive::Box { dimensions } => shape::Cuboid::new(dimensions / 2.0)
                        .contains_point(&pose.to_isometry(), &point),
                })
            })
            .map(|object| object.id.as_str())
    }
}
