use crate::move_group::{JointValues, Pose};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DescriptionError {
    #[error("group {0:?} is declared more than once")]
    DuplicateGroup(String),
    #[error("group {group:?} state {state:?} has {found} values for {expected} joints")]
    StateLength {
        group: String,
        state: String,
        expected: usize,
        found: usize,
    },
    #[error("group {group:?} refers to unknown link {link:?}")]
    UnknownGroupLink { group: String, link: String },
    #[error("group {group:?} default state {state:?} is not a named state")]
    UnknownDefaultState { group: String, state: String },
    #[error("disabled collision pair refers to unknown link {0:?}")]
    UnknownPairLink(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LinkPair {
    pub first: String,
    pub second: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NamedState {
    pub joints: Vec<f32>,
    /// Where the end effector ends up in this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_effector: Option<Pose>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GroupDescription {
    pub name: String,
    pub joints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_effector_link: Option<String>,
    #[serde(default)]
    pub named_states: BTreeMap<String, NamedState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_state: Option<String>,
}

impl GroupDescription {
    pub fn named_target_values(&self, name: &str) -> Option<JointValues> {
        self.named_states.get(name).map(|state| {
            self.joints
                .iter()
                .cloned()
                .zip(state.joints.iter().copied())
                .collect()
        })
    }

    pub fn has_joint(&self, joint: &str) -> bool {
        self.joints.iter().any(|name| name == joint)
    }
}

/// Semantic description of the robot: which joints form groups, their named
/// presets, and link pairs that never need collision checking.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RobotDescription {
    pub name: String,
    pub planning_frame: String,
    pub links: Vec<String>,
    pub groups: Vec<GroupDescription>,
    #[serde(default)]
    pub disabled_collisions: Vec<LinkPair>,
}

impl RobotDescription {
    pub fn group(&self, name: &str) -> Option<&GroupDescription> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|group| group.name.clone()).collect()
    }

    pub fn has_link(&self, link: &str) -> bool {
        self.links.iter().any(|name| name == link)
    }

    pub fn validate(&self) -> Result<(), DescriptionError> {
        let mut seen = BTreeSet::new();
        for group in &self.groups {
            if !seen.insert(group.name.as_str()) {
                return Err(DescriptionError::DuplicateGroup(group.name.clone()));
            }
            if let Some(link) = &group.end_effector_link {
                if !self.has_link(link) {
                    return Err(DescriptionError::UnknownGroupLink {
                        group: group.name.clone(),
                        link: link.clone(),
                    });
                }
            }
            for (state_name, state) in &group.named_states {
                if state.joints.len() != group.joints.len() {
                    return Err(DescriptionError::StateLength {
                        group: group.name.clone(),
                        state: state_name.clone(),
                        expected: group.joints.len(),
                        found: state.joints.len(),
                    });
                }
            }
            if let Some(default_state) = &group.default_state {
                if !group.named_states.contains_key(default_state) {
                    return Err(DescriptionError::UnknownDefaultState {
                        group: group.name.clone(),
                        state: default_state.clone(),
                    });
                }
            }
        }
        for pair in &self.disabled_collisions {
            for link in [&pair.first, &pair.second] {
                if !self.has_link(link) {
                    return Err(DescriptionError::UnknownPairLink(link.clone()));
                }
            }
        }
        Ok(())
    }
}
