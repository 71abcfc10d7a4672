use crate::value::ValueType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeySpec {
    pub keyparts: Vec<IndexKeyPart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexKeyPart {
    pub column: String,
    /// Optional path within property value (for JSON, future Ref, etc.)
    pub sub_path: Option<Vec<String>>,
    pub direction: IndexDirection, // ASC/DESC
    pub value_type: ValueType,     // Expected type for this key component
    pub nulls: Option<NullsOrder>, // PG-style NULLS FIRST/LAST (optional)
    pub collation: Option<String>, // collation name/id if relevant (optional)
}

impl IndexKeyPart {
    pub fn asc<S: Into<String>>(col: S, value_type: ValueType) -> Self {
        Self { column: col.into(), sub_path: None, direction: IndexDirection::Asc, value_type, nulls: None, collation: None }
    }
    pub fn desc<S: Into<String>>(col: S, value_type: ValueType) -> Self {
        Self { column: col.into(), sub_path: None, direction: IndexDirection::Desc, value_type, nulls: None, collation: None }
    }

    /// Create from a PathExpr (handles multi-step paths)
    pub fn from_path(path: &ankql::ast::PathExpr, direction: IndexDirection, value_type: ValueType) -> Self {
        let (column, sub_path) = if path.steps.len() == 1 {
            (path.steps[0].clone(), None)
        } else {
            let column = path.steps[0].clone();
            let sub_path = path.steps[1..].to_vec();
            (column, Some(sub_path))
        };
        Self { column, sub_path, direction, value_type, nulls: None, collation: None }
    }

    /// Full path as a flat string (e.g., "context.session_id")
    pub fn full_path(&self) -> String {
        match &self.sub_path {
            None => self.column.clone(),
            Some(sub) => {
                let mut parts = vec![self.column.clone()];
                parts.extend(sub.clone());
                parts.join(".")
            }
        }
    }

    /// Create from a flat path string (e.g., "context.session_id")
    pub fn from_flat_path(path: &str, direction: IndexDirection, value_type: ValueType) -> Self {
        let parts: Vec<&str> = path.split('.').collect();
        let (column, sub_path) = if parts.len() == 1 {
            (parts[0].to_string(), None)
        } else {
            let column = parts[0].to_string();
            let sub_path: Vec<String> = parts[1..].iter().map(|s| s.to_string()).collect();
            (column, Some(sub_path))
        };
        Self { column, sub_path, direction, value_type, nulls: None, collation: None }
    }

    /// Create ascending keypart from flat path
    pub fn asc_path(path: &str, value_type: ValueType) -> Self { Self::from_flat_path(path, IndexDirection::Asc, value_type) }

    /// Create descending keypart from flat path
    pub fn desc_path(path: &str, value_type: ValueType) -> Self { Self::from_flat_path(path, IndexDirection::Desc, value_type) }
}

impl IndexDirection {
    pub fn is_desc(&self) -> bool { matches!(self, IndexDirection::Desc) }
}

impl KeySpec {
    pub fn new(keyparts: Vec<IndexKeyPart>) -> Self { Self { keyparts } }

    /// Simple name generator similar to your existing helper.
    pub fn name_with(&self, prefix: &str, delim: &str) -> String {
        let fields: Vec<String> = self
            .keyparts
            .iter()
            .map(|k| {
                let dir = match k.direction {
                    IndexDirection::Asc => "asc",
                    IndexDirection::Desc => "desc",
                };
                let col_name = k.full_path();
                if k.collation.is_some() || k.nulls.is_some() {
                    // include extras only if present
                    let mut extras = Vec::new();
                    if let Some(c) = &k.collation {
                        extras.push(format!("collate={}", c));
                    }
                    if let Some(n) = &k.nulls {
                        extras.push(format!("nulls={:?}", n).to_lowercase());
                    }
                    format!("{} {}({})", col_name, dir, extras.join(","))
                } else {
                    format!("{} {}", col_name, dir)
                }
            })
            .collect();

        if prefix.is_empty() {
            fields.join(delim)
        } else {
            format!("{}{}{}", prefix, delim, fields.join(delim))
        }
    }

    /// Checks if this IndexSpec can be satisfied by another IndexSpec
    /// Returns Yes if this is a prefix subset of other
    /// Returns Inverse if this is a prefix subset of other with all directions flipped
    /// Returns No if neither condition is met
    pub fn matches(&self, other: &KeySpec) -> Option<IndexSpecMatch> {
        if self.keyparts.len() > other.keyparts.len() {
            return None;
        }

        let mut direct_match = true;
        let mut inverse_match = true;

        for (self_keypart, other_keypart) in self.keyparts.iter().zip(other.keyparts.iter()) {
            // Both column and sub_path must match
            if self_keypart.column != other_keypart.column || self_keypart.sub_path != other_keypart.sub_path {
                return None;
            }

            if self_keypart.direction != other_keypart.direction {
                direct_match = false;
            }

            if self_keypart.direction == other_keypart.direction {
                inverse_match = false;
            }
        }

        if direct_match {
            Some(IndexSpecMatch::Match)
        } else if inverse_match {
            Some(IndexSpecMatch::Inverse)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexSpecMatch {
    /// The index specs match
    Match,
    /// The index specs match, but scan direction must be inverted
    Inverse,
}
