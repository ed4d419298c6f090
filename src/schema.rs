//! Column metadata for one attack run.
//!
//! `Metadata` is the single source of truth for the dataset schema and the
//! one-hot column layout. It is created once per run from an external
//! description and is read-only thereafter; the encoder and the query
//! generator both derive their column order from it, never from observed
//! data, so every shadow dataset produces the same feature columns.

use crate::error::{AttackError, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Whether a shadow dataset belongs to the training or evaluation partition
/// of the attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Eval,
}

impl Split {
    /// Both splits in canonical order.
    pub fn all() -> [Split; 2] {
        [Split::Train, Split::Eval]
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Eval => write!(f, "eval"),
        }
    }
}

/// Kind of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Categorical,
    Continuous,
}

/// Descriptor for a single column.
///
/// The vocabulary lists every admissible category for a categorical column,
/// in the order that defines its one-hot block. Continuous columns carry an
/// empty vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    #[serde(default)]
    pub vocabulary: Vec<String>,
}

impl ColumnDescriptor {
    /// A categorical column with the given vocabulary.
    pub fn categorical(name: impl Into<String>, vocabulary: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Categorical,
            vocabulary,
        }
    }

    /// A continuous column.
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Continuous,
            vocabulary: Vec::new(),
        }
    }
}

/// Ordered, immutable column descriptors for one attack run.
///
/// Serialized as the plain descriptor list; deserialization runs through
/// [`Metadata::new`], so a decoded value carries the same validation and
/// name lookup as a constructed one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnDescriptor>", into = "Vec<ColumnDescriptor>")]
pub struct Metadata {
    columns: Vec<ColumnDescriptor>,
    name_index: AHashMap<String, usize>,
}

impl TryFrom<Vec<ColumnDescriptor>> for Metadata {
    type Error = AttackError;

    fn try_from(columns: Vec<ColumnDescriptor>) -> Result<Self> {
        Metadata::new(columns)
    }
}

impl From<Metadata> for Vec<ColumnDescriptor> {
    fn from(metadata: Metadata) -> Self {
        metadata.columns
    }
}

impl Metadata {
    /// Build run metadata from ordered column descriptors.
    ///
    /// Rejects duplicate column names, categorical columns without a
    /// vocabulary, and continuous columns carrying one.
    pub fn new(columns: Vec<ColumnDescriptor>) -> Result<Self> {
        if columns.is_empty() {
            return Err(AttackError::SchemaMismatch(
                "metadata must describe at least one column".to_string(),
            ));
        }

        let mut name_index = AHashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if name_index.insert(col.name.clone(), i).is_some() {
                return Err(AttackError::SchemaMismatch(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
            match col.kind {
                ColumnKind::Categorical if col.vocabulary.is_empty() => {
                    return Err(AttackError::SchemaMismatch(format!(
                        "categorical column '{}' has an empty vocabulary",
                        col.name
                    )));
                }
                ColumnKind::Continuous if !col.vocabulary.is_empty() => {
                    return Err(AttackError::SchemaMismatch(format!(
                        "continuous column '{}' must not carry a vocabulary",
                        col.name
                    )));
                }
                _ => {}
            }
        }

        Ok(Self {
            columns,
            name_index,
        })
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// All descriptors in schema order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a descriptor by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.name_index.get(name).map(|&i| &self.columns[i])
    }

    /// Position of a column in the schema.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    /// Indices of categorical columns, in schema order.
    pub fn categorical_indices(&self) -> Vec<usize> {
        self.indices_of(ColumnKind::Categorical)
    }

    /// Indices of continuous columns, in schema order.
    pub fn continuous_indices(&self) -> Vec<usize> {
        self.indices_of(ColumnKind::Continuous)
    }

    /// Names of categorical columns, in schema order.
    pub fn categorical_names(&self) -> Vec<&str> {
        self.names_of(ColumnKind::Categorical)
    }

    /// Names of continuous columns, in schema order.
    pub fn continuous_names(&self) -> Vec<&str> {
        self.names_of(ColumnKind::Continuous)
    }

    fn indices_of(&self, kind: ColumnKind) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == kind)
            .map(|(i, _)| i)
            .collect()
    }

    fn names_of(&self, kind: ColumnKind) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.as_str())
            .collect()
    }
}
