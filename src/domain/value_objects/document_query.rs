use serde::{Deserialize, Serialize};

use crate::domain::value_objects::DocumentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", content = "value", rename_all = "snake_case")]
pub enum FilenameFilter {
    Exact(String),
    Prefix(String),
}

impl FilenameFilter {
    pub fn matches(&self, filename: &str) -> bool {
        match self {
            FilenameFilter::Exact(name) => filename == name,
            FilenameFilter::Prefix(prefix) => filename.starts_with(prefix.as_str()),
        }
    }

    /// LIKE pattern for a prefix match, with `\`, `%` and `_` escaped.
    pub fn like_pattern(prefix: &str) -> String {
        let mut pattern = String::with_capacity(prefix.len() + 1);
        for c in prefix.chars() {
            if matches!(c, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Selection over the document table: optional filename filter, ordering by id,
/// offset/limit bounds and an optional keyset cursor.
///
/// The cursor excludes every id at or before it in the chosen order, so a
/// caller paging with `after(last_seen)` never sees a record twice.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentQuery {
    pub filename: Option<FilenameFilter>,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub offset: i64,
    pub limit: Option<i64>,
    pub cursor: Option<DocumentId>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filename_equals(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(FilenameFilter::Exact(filename.into()));
        self
    }

    pub fn filename_starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.filename = Some(FilenameFilter::Prefix(prefix.into()));
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn after(mut self, cursor: DocumentId) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Whether `id` lies strictly past the cursor in the query's order.
    pub fn is_past_cursor(&self, id: DocumentId) -> bool {
        match (self.cursor, self.order) {
            (None, _) => true,
            (Some(cursor), SortOrder::Ascending) => id > cursor,
            (Some(cursor), SortOrder::Descending) => id < cursor,
        }
    }
}
