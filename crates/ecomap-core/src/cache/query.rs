//! Parameterized filter predicates for the cache table.
//!
//! The SQL narrows rows using bound values only. It returns a superset of the
//! matching rows, and `FilterSpec::matches` makes the final decision, so cached
//! and in-memory filtering select the same records.

use crate::filter::{CategoryFilter, FilterSpec};
use crate::loader::LoaderConfig;

use super::schema::SEARCH_HAYSTACK_SQL;

/// A `WHERE` clause with `?` placeholders and the values bound to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlPredicate {
    pub clause: String,
    pub params: Vec<String>,
}

impl SqlPredicate {
    fn push(&mut self, condition: String, params: impl IntoIterator<Item = String>) {
        if !self.clause.is_empty() {
            self.clause.push_str(" AND ");
        }
        self.clause.push_str(&condition);
        self.params.extend(params);
    }

    /// Check if the predicate admits every row
    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }

    /// `WHERE ...` suffix, or empty when there is no condition
    pub fn where_sql(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clause)
        }
    }
}

/// Build the narrowing predicate for a filter.
pub fn build_predicate(filter: &FilterSpec, config: &LoaderConfig) -> SqlPredicate {
    let mut predicate = SqlPredicate::default();

    if let CategoryFilter::Only(category) = &filter.category {
        let mapped: Vec<String> = config.categories.iter().map(|c| c.folder.clone()).collect();
        let wanted: Vec<String> = config
            .folders_for(category)
            .into_iter()
            .map(str::to_string)
            .collect();

        // Rows in unmapped folders take their category from `type`; keep them
        // for the in-memory check.
        if !mapped.is_empty() {
            let unmapped = format!("folder NOT IN ({})", placeholders(mapped.len()));
            if wanted.is_empty() {
                predicate.push(unmapped, mapped);
            } else {
                let condition = format!("(folder IN ({}) OR {})", placeholders(wanted.len()), unmapped);
                predicate.push(condition, wanted.into_iter().chain(mapped));
            }
        }
    }

    if let Some(needle) = filter.search_needle() {
        if needle.is_ascii() {
            predicate.push(folded_like(SEARCH_HAYSTACK_SQL), [like_pattern(&needle)]);
        }
    }

    if let Some(needle) = filter.region_needle() {
        if needle.is_ascii() {
            predicate.push(folded_like("region"), [like_pattern(&needle)]);
        } else {
            predicate.push("region IS NOT NULL".to_string(), Vec::new());
        }
    }

    if let Some(needle) = filter.tag_needle() {
        if needle.is_ascii() {
            predicate.push(folded_like("tags"), [like_pattern(&needle)]);
        } else {
            predicate.push("tags IS NOT NULL".to_string(), Vec::new());
        }
    }

    predicate
}

/// Case-insensitive `LIKE` on `expr`.
///
/// SQLite folds ASCII case only, so values holding any other character pass
/// through and `FilterSpec::matches` decides them.
fn folded_like(expr: &str) -> String {
    format!(
        "({expr} LIKE ? ESCAPE '\\' OR length({expr}) <> length(CAST({expr} AS BLOB)))",
        expr = expr
    )
}

/// `%needle%` with LIKE wildcards escaped.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
