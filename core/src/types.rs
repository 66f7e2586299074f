//! Domain types for the subset API.
//!
//! # Design
//! `Subset` is the caller-facing value; its static/dynamic distinction is a
//! `SubsetKind` variant rather than a flag next to two optional fields. The
//! wire shapes (`SubsetBody` going out, `SubsetRecord` coming back) are
//! private and mapped explicitly, so the OData field names stay in this file.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::url::{element_bind, hierarchy_path, resolve_hierarchy};

/// Which of the two disjoint subset collections of a hierarchy to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    /// The OData collection segment for this visibility.
    pub fn collection(self) -> &'static str {
        match self {
            Visibility::Public => "Subsets",
            Visibility::Private => "PrivateSubsets",
        }
    }

    pub fn is_private(self) -> bool {
        self == Visibility::Private
    }
}

impl From<bool> for Visibility {
    fn from(private: bool) -> Self {
        if private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }
}

/// How a subset defines its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubsetKind {
    /// An explicit, ordered list of element names.
    Static { elements: Vec<String> },
    /// An MDX set expression evaluated by the server.
    Dynamic { expression: String },
}

/// A named selection of elements within a dimension hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subset {
    pub name: String,
    pub dimension_name: String,
    pub hierarchy_name: String,
    pub alias: Option<String>,
    pub kind: SubsetKind,
}

impl Subset {
    pub fn new_static<I, S>(name: &str, dimension: &str, hierarchy: Option<&str>, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            dimension_name: dimension.to_string(),
            hierarchy_name: resolve_hierarchy(dimension, hierarchy).to_string(),
            alias: None,
            kind: SubsetKind::Static {
                elements: elements.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn new_dynamic(name: &str, dimension: &str, hierarchy: Option<&str>, expression: &str) -> Self {
        Self {
            name: name.to_string(),
            dimension_name: dimension.to_string(),
            hierarchy_name: resolve_hierarchy(dimension, hierarchy).to_string(),
            alias: None,
            kind: SubsetKind::Dynamic {
                expression: expression.to_string(),
            },
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn is_static(&self) -> bool {
        matches!(self.kind, SubsetKind::Static { .. })
    }

    /// The enumerated members; empty for a dynamic subset.
    pub fn elements(&self) -> &[String] {
        match &self.kind {
            SubsetKind::Static { elements } => elements,
            SubsetKind::Dynamic { .. } => &[],
        }
    }

    pub fn expression(&self) -> Option<&str> {
        match &self.kind {
            SubsetKind::Static { .. } => None,
            SubsetKind::Dynamic { expression } => Some(expression),
        }
    }

    /// A static copy of this subset that lists exactly `elements`.
    pub fn with_elements(&self, elements: Vec<String>) -> Self {
        Self {
            kind: SubsetKind::Static { elements },
            ..self.clone()
        }
    }

    /// The JSON payload used to create or patch this subset.
    pub fn body(&self) -> Result<String, ApiError> {
        let hierarchy = resolve_hierarchy(&self.dimension_name, Some(&self.hierarchy_name));
        let hierarchy_bind = hierarchy_path(&self.dimension_name, hierarchy);
        let (expression, elements) = match &self.kind {
            SubsetKind::Dynamic { expression } => (Some(expression.as_str()), None),
            SubsetKind::Static { elements } => (
                None,
                Some(
                    elements
                        .iter()
                        .map(|e| element_bind(&self.dimension_name, hierarchy, e))
                        .collect::<Vec<_>>(),
                ),
            ),
        };
        let body = SubsetBody {
            name: &self.name,
            alias: self.alias.as_deref(),
            hierarchy: hierarchy_bind,
            expression,
            elements,
        };
        serde_json::to_string(&body).map_err(|e| ApiError::SerializationError(e.to_string()))
    }
}

#[derive(Serialize)]
struct SubsetBody<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Alias", skip_serializing_if = "Option::is_none")]
    alias: Option<&'a str>,
    #[serde(rename = "Hierarchy@odata.bind")]
    hierarchy: String,
    #[serde(rename = "Expression", skip_serializing_if = "Option::is_none")]
    expression: Option<&'a str>,
    #[serde(rename = "Elements@odata.bind", skip_serializing_if = "Option::is_none")]
    elements: Option<Vec<String>>,
}

/// Payload of the `tm1.SaveAs` action. Field order is part of the contract.
#[derive(Debug, Serialize)]
pub(crate) struct SaveAsBody<'a> {
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "MakePrivate")]
    pub make_private: bool,
    #[serde(rename = "MakeStatic")]
    pub make_static: bool,
}

#[derive(Deserialize)]
pub(crate) struct NamedEntry {
    #[serde(rename = "Name")]
    pub name: String,
}

/// OData collection envelope: `{"value": [...]}`.
#[derive(Deserialize)]
pub(crate) struct Collection<T> {
    pub value: Vec<T>,
}

#[derive(Deserialize)]
struct HierarchyRecord {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Dimension", default)]
    dimension: Option<NamedEntry>,
}

/// A subset as returned by GET with the hierarchy and elements expanded.
#[derive(Deserialize)]
pub(crate) struct SubsetRecord {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "UniqueName", default)]
    unique_name: Option<String>,
    #[serde(rename = "Alias", default)]
    alias: Option<String>,
    #[serde(rename = "Expression", default)]
    expression: Option<String>,
    #[serde(rename = "Hierarchy")]
    hierarchy: HierarchyRecord,
    #[serde(rename = "Elements", default)]
    elements: Option<Vec<NamedEntry>>,
}

impl TryFrom<SubsetRecord> for Subset {
    type Error = ApiError;

    fn try_from(record: SubsetRecord) -> Result<Self, Self::Error> {
        let dimension_name = match (record.hierarchy.dimension, record.unique_name.as_deref()) {
            (Some(dimension), _) => dimension.name,
            (None, Some(unique)) => dimension_from_unique_name(unique).ok_or_else(|| {
                ApiError::DeserializationError(format!("malformed UniqueName: {unique}"))
            })?,
            (None, None) => {
                return Err(ApiError::DeserializationError(format!(
                    "subset {} carries no dimension",
                    record.name
                )))
            }
        };
        let kind = match record.expression {
            Some(expression) if !expression.is_empty() => SubsetKind::Dynamic { expression },
            _ => SubsetKind::Static {
                elements: record
                    .elements
                    .unwrap_or_default()
                    .into_iter()
                    .map(|e| e.name)
                    .collect(),
            },
        };
        Ok(Subset {
            name: record.name,
            dimension_name,
            hierarchy_name: record.hierarchy.name,
            alias: record.alias.filter(|a| !a.is_empty()),
            kind,
        })
    }
}

/// `[Region].[Europe].[Top 10]` → `Region`. A `]]` inside the brackets is
/// an escaped `]`.
fn dimension_from_unique_name(unique: &str) -> Option<String> {
    let mut chars = unique.strip_prefix('[')?.chars();
    let mut dimension = String::new();
    while let Some(c) = chars.next() {
        if c != ']' {
            dimension.push(c);
            continue;
        }
        match chars.next()? {
            ']' => dimension.push(']'),
            '.' => return Some(dimension),
            _ => return None,
        }
    }
    None
}
