use std::fmt;
use thiserror::Error;

pub const DEFAULT_NODE_NAME: &str = "move_group_interface_tutorial";
pub const ROOT_NAMESPACE: &str = "/";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NodeError {
    #[error("invalid node name {0:?}")]
    InvalidName(String),
    #[error("invalid namespace {0:?}")]
    InvalidNamespace(String),
}

/// Name and namespace the process registers under with the motion framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOptions {
    name: String,
    namespace: String,
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl NodeOptions {
    pub fn new(name: &str, namespace: &str) -> Result<Self, NodeError> {
        if !is_valid_name(name) {
            return Err(NodeError::InvalidName(name.to_owned()));
        }
        let namespace = match namespace {
            "" | ROOT_NAMESPACE => ROOT_NAMESPACE.to_owned(),
            _ => {
                let trimmed = namespace.strip_suffix('/').unwrap_or(namespace);
                let segments = trimmed.strip_prefix('/').unwrap_or(trimmed);
                if !segments.split('/').all(is_valid_name) {
                    return Err(NodeError::InvalidNamespace(namespace.to_owned()));
                }
                format!("/{}", segments)
            }
        };
        Ok(Self {
            name: name.to_owned(),
            namespace,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn fully_qualified_name(&self) -> String {
        if self.namespace == ROOT_NAMESPACE {
            format!("/{}", self.name)
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_NODE_NAME.to_owned(),
            namespace: ROOT_NAMESPACE.to_owned(),
        }
    }
}

impl fmt::Display for NodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fully_qualified_name())
    }
}
