//! Node identity — who this process is, fixed for its whole lifetime.

use serde::{Deserialize, Serialize};

/// How a node decides whether it may become leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eligibility {
    /// May be elected.
    #[default]
    Eligible,
    /// Never self-elects; only follows.
    Observer,
    /// Coin flip at startup.
    Random,
}

impl Eligibility {
    /// Resolve to the fixed flag carried by `NodeIdentity`.
    pub fn resolve(self) -> bool {
        match self {
            Eligibility::Eligible => true,
            Eligibility::Observer => false,
            Eligibility::Random => rand::random::<bool>(),
        }
    }
}

impl std::str::FromStr for Eligibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eligible" => Ok(Eligibility::Eligible),
            "observer" => Ok(Eligibility::Observer),
            "random" => Ok(Eligibility::Random),
            other => Err(format!(
                "unknown eligibility {other:?} (expected eligible, observer, or random)"
            )),
        }
    }
}

/// Immutable identity of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    name: String,
    endpoint: String,
    eligible: bool,
}

impl NodeIdentity {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, eligible: bool) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            eligible,
        }
    }

    /// Globally unique name under which the node is registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address (`host:port`) other nodes use to reach this one.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether this node may become leader.
    pub fn is_eligible(&self) -> bool {
        self.eligible
    }
}

/// Generate a random node name.
pub fn generate_node_name() -> String {
    format!("node-{:016x}", rand::random::<u64>())
}

/// Names travel in directory URLs, so keep them to a path-safe alphabet.
pub fn is_valid_node_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
