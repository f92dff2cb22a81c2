//! Filter Engine
//!
//! `FilterSpec` decides whether a single entity record is selected. It is the one
//! place where search, category, region and tag constraints are evaluated, for
//! both the list view and the graph seed set.
//!
//! Blank fields impose no constraint. Every set field must match (logical AND),
//! and all text comparisons are case-insensitive substring checks.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Category, EntityRecord};

// ============================================================================
// Category Filter
// ============================================================================

/// Category constraint of a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryFilter {
    /// Any category matches
    #[default]
    All,
    /// Only records of this category match
    Only(Category),
}

impl CategoryFilter {
    /// Check if a category satisfies this constraint
    pub fn admits(&self, category: &Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted.same_as(category),
        }
    }

    /// Check if this is the unconstrained filter
    pub fn is_all(&self) -> bool {
        matches!(self, CategoryFilter::All)
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        CategoryFilter::Only(category)
    }
}

/// "all", "*" and blank parse to `All`; anything else names a category.
impl FromStr for CategoryFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "*" || trimmed.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(Category::parse(trimmed)))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("All"),
            CategoryFilter::Only(category) => write!(f, "{}", category),
        }
    }
}

// ============================================================================
// Filter Spec
// ============================================================================

/// Multi-field record filter.
///
/// ## Example
///
/// ```
/// use ecomap_core::{Category, CategoryFilter, EntityRecord, FilterSpec};
///
/// let record = EntityRecord::new("food-bank", Category::Service)
///     .with_name("Food Bank")
///     .with_region("North")
///     .with_tags(["food", "community"]);
///
/// let filter = FilterSpec::new()
///     .with_category(CategoryFilter::Only(Category::Service))
///     .with_tag("comm");
/// assert!(filter.matches(&record));
/// assert!(!filter.with_region("south").matches(&record));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Free-text needle matched against label, id, organisation and tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,

    /// Category constraint
    #[serde(default)]
    pub category: CategoryFilter,

    /// Needle matched against the record's region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_substring: Option<String>,

    /// Needle matched against each tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_substring: Option<String>,
}

impl FilterSpec {
    /// Create an open filter that matches every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text search
    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    /// Set the category constraint
    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    /// Set the region needle
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region_substring = Some(region.into());
        self
    }

    /// Set the tag needle
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag_substring = Some(tag.into());
        self
    }

    /// Normalized search needle, `None` when blank.
    pub fn search_needle(&self) -> Option<String> {
        needle(&self.search_text)
    }

    /// Normalized region needle, `None` when blank.
    pub fn region_needle(&self) -> Option<String> {
        needle(&self.region_substring)
    }

    /// Normalized tag needle, `None` when blank.
    pub fn tag_needle(&self) -> Option<String> {
        needle(&self.tag_substring)
    }

    /// Check if no constraint is set, so every record matches.
    pub fn is_open(&self) -> bool {
        self.category.is_all()
            && self.search_needle().is_none()
            && self.region_needle().is_none()
            && self.tag_needle().is_none()
    }

    /// Decide whether a record is selected.
    pub fn matches(&self, record: &EntityRecord) -> bool {
        if !self.category.admits(&record.category) {
            return false;
        }

        if let Some(needle) = self.search_needle() {
            if !search_haystack(record).contains(&needle) {
                return false;
            }
        }

        if let Some(needle) = self.region_needle() {
            let in_region = record
                .region
                .as_deref()
                .is_some_and(|region| region.to_lowercase().contains(&needle));
            if !in_region {
                return false;
            }
        }

        if let Some(needle) = self.tag_needle() {
            let tagged = record
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle));
            if !tagged {
                return false;
            }
        }

        true
    }

    /// Select the matching records, preserving input order.
    pub fn apply<'a>(&self, records: &'a [EntityRecord]) -> Vec<&'a EntityRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_open() {
            return f.write_str("(no filters)");
        }

        let mut parts = Vec::new();
        if let Some(search) = self.search_needle() {
            parts.push(format!("search={:?}", search));
        }
        if !self.category.is_all() {
            parts.push(format!("category={}", self.category));
        }
        if let Some(region) = self.region_needle() {
            parts.push(format!("region={:?}", region));
        }
        if let Some(tag) = self.tag_needle() {
            parts.push(format!("tag={:?}", tag));
        }
        f.write_str(&parts.join(" "))
    }
}

/// Text the free-text search runs against, lower-cased.
///
/// Layout: `"{label} {id} {organisation} {tags joined by ", "}"`.
pub fn search_haystack(record: &EntityRecord) -> String {
    format!(
        "{} {} {} {}",
        record.label(),
        record.id,
        record.organisation.as_deref().unwrap_or(""),
        record.joined_tags()
    )
    .to_lowercase()
}

fn needle(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn council() -> EntityRecord {
        EntityRecord::new("townville-council", Category::Organization)
            .with_name("Townville Council")
            .with_organisation("Townville")
            .with_region("North West")
            .with_tags(["Safeguarding", "housing"])
    }

    #[test]
    fn test_open_filter_matches_everything() {
        let filter = FilterSpec::new();
        assert!(filter.is_open());
        assert!(filter.matches(&council()));
        assert!(filter.matches(&EntityRecord::new("bare", Category::Item)));
    }

    #[test]
    fn test_blank_fields_are_unset() {
        let filter = FilterSpec::new()
            .with_search("   ")
            .with_region("")
            .with_tag("\t");
        assert!(filter.is_open());
        assert!(filter.matches(&EntityRecord::new("bare", Category::Item)));
    }

    #[test]
    fn test_search_covers_label_id_organisation_and_tags() {
        let record = council();
        assert!(FilterSpec::new().with_search("TOWNVILLE C").matches(&record));
        assert!(FilterSpec::new().with_search("council").matches(&record));
        assert!(FilterSpec::new().with_search("safeguarding, hous").matches(&record));
        assert!(!FilterSpec::new().with_search("north").matches(&record));
    }

    #[test]
    fn test_search_matches_id_when_name_missing() {
        let record = EntityRecord::new("food-bank", Category::Service);
        assert!(FilterSpec::new().with_search("food-b").matches(&record));
    }

    #[test]
    fn test_category_filter() {
        let record = council();
        let only_org = FilterSpec::new().with_category(Category::Organization.into());
        let only_plan = FilterSpec::new().with_category(Category::Plan.into());
        assert!(only_org.matches(&record));
        assert!(!only_plan.matches(&record));
    }

    #[test]
    fn test_category_filter_parse() {
        assert_eq!("All".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!("".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "services".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(Category::Service)
        );
    }

    #[test]
    fn test_custom_category_ignores_case() {
        let record = EntityRecord::new("census", Category::Custom("Dataset".to_string()));
        let filter: CategoryFilter = "dataset".parse().unwrap();
        assert!(FilterSpec::new().with_category(filter).matches(&record));

        let filter: CategoryFilter = "DATASETS".parse().unwrap();
        assert!(!FilterSpec::new().with_category(filter).matches(&record));
    }

    #[test]
    fn test_region_absent_fails_when_set() {
        let record = EntityRecord::new("a", Category::Plan);
        assert!(!FilterSpec::new().with_region("north").matches(&record));
        assert!(FilterSpec::new().with_region("WEST").matches(&council()));
    }

    #[test]
    fn test_tag_matches_any_tag() {
        let record = council();
        assert!(FilterSpec::new().with_tag("safeguard").matches(&record));
        assert!(FilterSpec::new().with_tag("HOUS").matches(&record));
        assert!(!FilterSpec::new().with_tag("transport").matches(&record));
        assert!(!FilterSpec::new()
            .with_tag("x")
            .matches(&EntityRecord::new("untagged", Category::Item)));
    }

    #[test]
    fn test_predicates_are_anded() {
        let record = council();
        let filter = FilterSpec::new().with_tag("safeguard").with_region("north");
        assert!(filter.matches(&record));

        let filter = filter.with_category(Category::Service.into());
        assert!(!filter.matches(&record));
    }

    #[test]
    fn test_adding_constraint_never_grows_selection() {
        let records = vec![
            council(),
            EntityRecord::new("food-bank", Category::Service).with_tags(["food"]),
            EntityRecord::new("youth-plan", Category::Plan).with_region("North"),
        ];
        let loose = FilterSpec::new().with_search("o");
        let tight = loose.clone().with_region("north");

        let loose_ids: Vec<_> = loose.apply(&records).iter().map(|r| &r.id).collect();
        for record in tight.apply(&records) {
            assert!(loose_ids.contains(&&record.id));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(FilterSpec::new().to_string(), "(no filters)");
        let filter = FilterSpec::new()
            .with_tag("Safe")
            .with_category(Category::Service.into());
        assert_eq!(filter.to_string(), "category=Service tag=\"safe\"");
    }
}
