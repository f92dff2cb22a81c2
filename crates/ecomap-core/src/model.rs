//! Record Schema Definitions
//!
//! This module defines the two record shapes loaded from the corpus:
//! - `EntityRecord`: one authored document per organization, service, plan, etc.
//! - `RelationshipRecord`: one authored document per typed edge between entities.
//!
//! Entities of every category share a single id namespace, because relationship
//! documents reference ids without qualifying them by category.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Group assigned to relationship endpoints that have no loaded entity.
pub const UNCLASSIFIED_GROUP: &str = "Unclassified";

/// Relationship type used when a document does not declare one.
pub const DEFAULT_RELATIONSHIP_TYPE: &str = "relatesTo";

// ============================================================================
// Category
// ============================================================================

/// Category of an entity record.
///
/// The built-in set mirrors the corpus folder layout. `Custom` keeps the set
/// open for folders mapped to labels outside the built-ins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Organization,
    Service,
    Plan,
    Event,
    Collection,
    Item,
    Resource,
    /// Any other category label
    Custom(String),
}

impl Category {
    /// All built-in categories, in default folder order.
    pub const BUILTIN: [Category; 7] = [
        Category::Organization,
        Category::Service,
        Category::Plan,
        Category::Event,
        Category::Collection,
        Category::Item,
        Category::Resource,
    ];

    /// Display label, also used as the graph group.
    pub fn as_str(&self) -> &str {
        match self {
            Category::Organization => "Organization",
            Category::Service => "Service",
            Category::Plan => "Plan",
            Category::Event => "Event",
            Category::Collection => "Collection",
            Category::Item => "Item",
            Category::Resource => "Resource",
            Category::Custom(label) => label,
        }
    }

    /// Default folder name holding documents of this category.
    pub fn default_folder(&self) -> String {
        match self {
            Category::Custom(label) => label.to_lowercase(),
            other => format!("{}s", other.as_str().to_lowercase()),
        }
    }

    /// Upper-case `@type` tag (e.g. "ORGANIZATION").
    pub fn type_tag(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Parse a category from a label, folder name, or `@type` tag.
    ///
    /// Never fails: unrecognized text becomes `Category::Custom`.
    pub fn parse(value: &str) -> Category {
        let trimmed = value.trim();
        match trimmed.to_lowercase().as_str() {
            "organization" | "organizations" | "organisation" | "organisations" => {
                Category::Organization
            }
            "service" | "services" => Category::Service,
            "plan" | "plans" => Category::Plan,
            "event" | "events" => Category::Event,
            "collection" | "collections" => Category::Collection,
            "item" | "items" => Category::Item,
            "resource" | "resources" => Category::Resource,
            _ => Category::Custom(trimmed.to_string()),
        }
    }

    /// Compare the way filters do: custom labels ignore case.
    pub fn same_as(&self, other: &Category) -> bool {
        match (self, other) {
            (Category::Custom(a), Category::Custom(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => self == other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::parse(s))
    }
}

impl Serialize for Category {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Accepts labels, folder names and `@type` tags alike.
impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Category::parse(&s))
    }
}

// ============================================================================
// Entity Record
// ============================================================================

/// One authored entity document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Stable identifier (source file stem)
    pub id: String,

    /// Category, taken from the folder the document lives in
    pub category: Category,

    /// Display name; `label()` falls back to the id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Free-text refinement of the category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Tags with duplicates collapsed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,

    /// Raw `@type` value as authored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,

    /// Folder the document was read from
    pub folder: String,

    /// Source file name including extension
    pub filename: String,
}

impl EntityRecord {
    /// Create a record with only an id and category set.
    pub fn new(id: impl Into<String>, category: Category) -> Self {
        let id = id.into();
        Self {
            folder: category.default_folder(),
            filename: format!("{}.yaml", id),
            id,
            category,
            name: None,
            subtype: None,
            organisation: None,
            region: None,
            tags: Vec::new(),
            projects: Vec::new(),
            declared_type: None,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_empty(name.into());
        self
    }

    /// Set the subtype
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = non_empty(subtype.into());
        self
    }

    /// Set the organisation
    pub fn with_organisation(mut self, organisation: impl Into<String>) -> Self {
        self.organisation = non_empty(organisation.into());
        self
    }

    /// Set the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = non_empty(region.into());
        self
    }

    /// Set the tags, collapsing duplicates
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = collapse_duplicates(tags);
        self
    }

    /// Set the projects, collapsing duplicates
    pub fn with_projects<I, S>(mut self, projects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projects = collapse_duplicates(projects);
        self
    }

    /// Set the raw `@type` value
    pub fn with_declared_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = non_empty(declared_type.into());
        self
    }

    /// Set the folder and file name the record was read from
    pub fn with_provenance(mut self, folder: impl Into<String>, filename: impl Into<String>) -> Self {
        self.folder = folder.into();
        self.filename = filename.into();
        self
    }

    /// Display label: the name, or the id when no name was authored.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// `@type` tag for the record: the authored one, or the category's.
    pub fn type_tag(&self) -> String {
        self.declared_type
            .clone()
            .unwrap_or_else(|| self.category.type_tag())
    }

    /// Tags joined with ", "
    pub fn joined_tags(&self) -> String {
        self.tags.join(", ")
    }

    /// Projects joined with ", "
    pub fn joined_projects(&self) -> String {
        self.projects.join(", ")
    }
}

// ============================================================================
// Relationship Record
// ============================================================================

/// One authored relationship document.
///
/// Endpoints reference entity ids by value and may dangle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Stable identifier (source file stem)
    pub id: String,

    /// Source entity id
    #[serde(rename = "source")]
    pub source_id: String,

    /// Target entity id
    #[serde(rename = "target")]
    pub target_id: String,

    /// Relationship label (defaults to "relatesTo")
    pub relationship_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl RelationshipRecord {
    /// Create a "relatesTo" relationship between two ids.
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            relationship_type: DEFAULT_RELATIONSHIP_TYPE.to_string(),
            description: None,
            name: None,
            tags: Vec::new(),
        }
    }

    /// Set the relationship type; blank values keep the default
    pub fn with_type(mut self, relationship_type: impl Into<String>) -> Self {
        if let Some(t) = non_empty(relationship_type.into()) {
            self.relationship_type = t;
        }
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = non_empty(description.into());
        self
    }

    /// Set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_empty(name.into());
        self
    }

    /// Set the tags, collapsing duplicates
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = collapse_duplicates(tags);
        self
    }

    /// Display name, falling back to "source → target"
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{} → {}", self.source_id, self.target_id))
    }

    /// Check if either endpoint is the given id
    pub fn touches(&self, id: &str) -> bool {
        self.source_id == id || self.target_id == id
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Trim values, drop blanks, and keep the first occurrence of each value.
pub fn collapse_duplicates<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.into();
        let trimmed = value.trim();
        if !trimmed.is_empty() && !out.iter().any(|v| v == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    out
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
