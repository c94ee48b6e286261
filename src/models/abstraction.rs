use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A named conceptual unit of the analyzed codebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abstraction {
    pub name: String,
    pub description: String,
    /// Indices into the store listing the build ran against
    pub file_indices: BTreeSet<usize>,
    /// Touches a conventional program entry point (main.rs, main.py, ...)
    #[serde(default)]
    pub entry_point: bool,
}

/// Directed edge between two abstractions, by position in the abstraction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: usize,
    pub to: usize,
    pub label: String,
}

/// An edge proposed by the reasoning step that did not make it into the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipWarning {
    /// `from == to`
    SelfLoop { abstraction: String, label: String },
    /// An endpoint that names no known abstraction
    Unresolved { reference: String, label: String },
    /// The response carried no usable relationship list at all
    Unparseable { detail: String },
}

impl fmt::Display for RelationshipWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipWarning::SelfLoop { abstraction, label } => {
                write!(f, "dropped self-loop on '{abstraction}' ({label})")
            }
            RelationshipWarning::Unresolved { reference, label } => {
                write!(f, "dropped edge with unknown endpoint '{reference}' ({label})")
            }
            RelationshipWarning::Unparseable { detail } => {
                write!(f, "relationship list unusable: {detail}")
            }
        }
    }
}

/// Order in which abstractions are documented.
///
/// Always a permutation of `0..len`; construction checks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct TraversalOrder(Vec<usize>);

impl TraversalOrder {
    pub fn new(order: Vec<usize>) -> Result<Self, String> {
        let mut seen = vec![false; order.len()];
        for &idx in &order {
            if idx >= order.len() {
                return Err(format!(
                    "index {idx} out of range for {} abstractions",
                    order.len()
                ));
            }
            if seen[idx] {
                return Err(format!("index {idx} appears more than once"));
            }
            seen[idx] = true;
        }
        Ok(Self(order))
    }

    pub fn identity(len: usize) -> Self {
        Self((0..len).collect())
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl TryFrom<Vec<usize>> for TraversalOrder {
    type Error = String;

    fn try_from(value: Vec<usize>) -> Result<Self, Self::Error> {
        TraversalOrder::new(value)
    }
}

impl From<TraversalOrder> for Vec<usize> {
    fn from(value: TraversalOrder) -> Self {
        value.0
    }
}
