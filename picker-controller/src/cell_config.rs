use crate::robot_description::{DescriptionError, RobotDescription};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, str};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error while accessing configuration")]
    Io(#[from] std::io::Error),
    #[error("error while parsing json")]
    Json(#[from] serde_json::Error),
    #[error("error while parsing yaml")]
    Yaml(#[from] serde_yaml::Error),
    #[error("can't tell configuration format of {0:?}")]
    UnknownFormat(PathBuf),
    #[error("invalid robot description")]
    Description(#[from] DescriptionError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

type Result<T> = std::result::Result<T, ConfigError>;

/// The box that gets picked up
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ObjectConfig {
    pub id: String,
    /// full edge lengths
    pub dimensions: Vector3<f32>,
    /// center of the box in the planning frame
    pub position: Vector3<f32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraspConfig {
    pub left_finger_link: String,
    /// object gets attached to this one
    pub right_finger_link: String,
}

/// Waypoint offsets in metres, all applied to the previous target
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MotionConfig {
    pub home_target: String,
    pub open_target: String,
    pub closed_target: String,
    /// absolute height above the object before descending
    pub approach_height: f32,
    pub grasp_descent: f32,
    pub lift_height: f32,
    pub transport_offset_x: f32,
    pub place_descent: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub base_position: Vector3<f32>,
    pub reach_radius: f32,
    /// tool point in the end effector frame
    pub tool_offset: Vector3<f32>,
    /// links that stand in for the tool point in collision checks
    pub tool_links: Vec<String>,
    /// max cartesian distance between waypoints
    pub waypoint_spacing: f32,
    /// max joint change between waypoints
    pub joint_step: f32,
    pub waypoint_delay_ms: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            base_position: Vector3::zeros(),
            reach_radius: 0.85,
            tool_offset: Vector3::zeros(),
            tool_links: vec![],
            waypoint_spacing: 0.01,
            joint_step: 0.05,
            waypoint_delay_ms: 0,
        }
    }
}

impl SimulationSettings {
    pub fn waypoint_delay(&self) -> Duration {
        Duration::from_millis(self.waypoint_delay_ms)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CellConfig {
    pub arm_group: String,
    pub gripper_group: String,
    pub end_effector_link: String,
    pub object: ObjectConfig,
    pub grasp: GraspConfig,
    pub motion: MotionConfig,
    /// pause after each scene edit so the service picks it up
    pub scene_settle_ms: u64,
    pub robot: RobotDescription,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

impl CellConfig {
    /// A UR5 with a Robotiq 85 gripper picking a 6 cm box comes as the included config.
    ///
    /// This file is packaged with the binary
    /// This method retrieves this included version
    pub fn included() -> Result<CellConfig> {
        let json = include_str!("../config/ur5_robotiq.json");
        CellConfig::parse_json(json)
    }

    pub fn scene_settle(&self) -> Duration {
        Duration::from_millis(self.scene_settle_ms)
    }

    pub fn parse_json(text: &str) -> Result<CellConfig> {
        let config: CellConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse_yaml(text: &str) -> Result<CellConfig> {
        let config: CellConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn serialize_to_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }

    pub fn serialize_to_yaml(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(yaml)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.serialize_to_json()?)?;
        Ok(())
    }

    pub fn save_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.serialize_to_yaml()?)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<CellConfig> {
        let text = fs::read_to_string(path)?;
        CellConfig::parse_json(&text)
    }

    pub fn load_yaml(path: impl AsRef<Path>) -> Result<CellConfig> {
        let text = fs::read_to_string(path)?;
        CellConfig::parse_yaml(&text)
    }

    /// Picks the parser from the file extension
    pub fn load(path: impl AsRef<Path>) -> Result<CellConfig> {
        let path = path.as_ref();
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("json") => CellConfig::load_json(path),
            Some("yaml") | Some("yml") => CellConfig::load_yaml(path),
            _ => Err(ConfigError::UnknownFormat(path.to_owned())),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.robot.validate()?;
        let arm = self
            .robot
            .group(&self.arm_group)
            .ok_or_else(|| ConfigError::Invalid(format!("no arm group {:?}", self.arm_group)))?;
        let gripper = self.robot.group(&self.gripper_group).ok_or_else(|| {
            ConfigError::Invalid(format!("no gripper group {:?}", self.gripper_group))
        })?;
        if !arm.named_states.contains_key(&self.motion.home_target) {
            return Err(ConfigError::Invalid(format!(
                "arm has no {:?} state",
                self.motion.home_target
            )));
        }
        for target in [&self.motion.open_target, &self.motion.closed_target] {
            if !gripper.named_states.contains_key(target) {
                return Err(ConfigError::Invalid(format!(
                    "gripper has no {:?} state",
                    target
                )));
            }
        }
        for link in [
            &self.end_effector_link,
            &self.grasp.left_finger_link,
            &self.grasp.right_finger_link,
        ] {
            if !self.robot.has_link(link) {
                return Err(ConfigError::Invalid(format!("unknown link {:?}", link)));
            }
        }
        if self.object.dimensions.iter().any(|side| *side <= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "object {:?} needs positive dimensions",
                self.object.id
            )));
        }
        let simulation = &self.simulation;
        for (name, value) in [
            ("reach_radius", simulation.reach_radius),
            ("waypoint_spacing", simulation.waypoint_spacing),
            ("joint_step", simulation.joint_step),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "simulation {} has to be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
