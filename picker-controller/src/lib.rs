//! Scripted pick and place for an arm with a parallel gripper.
//!
//! The choreography in [`pick_and_place`] only talks to the motion and scene
//! services through the [`move_group::MoveGroup`] and
//! [`scene::PlanningSceneInterface`] traits. [`sim`] provides an in-process
//! implementation of both.

pub mod cell_config;
pub mod move_group;
pub mod node;
pub mod pick_and_place;
pub mod robot_description;
pub mod scene;
pub mod sim;
