//! Query parameters for `list`
//!
//! Parsing is permissive: a parameter with the wrong JSON type is dropped
//! instead of failing the command, so a sloppy script still gets a listing.
//! Only the `where` clause is validated, and that happens in the store.

use serde_json::Value as JsonValue;

/// `orderBy` clause: a single field and a direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    /// Parse `"field"`, `"field asc"` or `"field desc"`
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split_whitespace();
        let field = parts.next()?.to_string();

        let descending = match parts.next() {
            None => false,
            Some(dir) if dir.eq_ignore_ascii_case("asc") => false,
            Some(dir) if dir.eq_ignore_ascii_case("desc") => true,
            Some(_) => return None,
        };

        if parts.next().is_some() {
            return None;
        }

        Some(Self { field, descending })
    }
}

/// Parameters accepted by the `list` command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pub where_clause: Option<String>,
    pub params: Vec<JsonValue>,
    pub order_by: Option<OrderBy>,
    pub page: Option<usize>,
    pub records_per_page: Option<usize>,
    pub skip: Option<usize>,
    pub count: bool,
    pub fields: Vec<String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from the optional `params.query` node
    pub fn from_json(node: Option<&JsonValue>) -> Self {
        let Some(JsonValue::Object(obj)) = node else {
            return Self::default();
        };

        let where_clause = obj
            .get("where")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let params = match obj.get("params") {
            Some(JsonValue::Array(values)) => values.clone(),
            Some(JsonValue::Null) | None => Vec::new(),
            Some(JsonValue::Object(_)) => Vec::new(),
            Some(scalar) => vec![scalar.clone()],
        };

        let order_by = obj
            .get("orderBy")
            .and_then(JsonValue::as_str)
            .and_then(OrderBy::parse);

        let fields = obj
            .get("fields")
            .and_then(JsonValue::as_str)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            where_clause,
            params,
            order_by,
            page: obj.get("page").and_then(as_usize),
            records_per_page: obj.get("recordsPerPage").and_then(as_usize),
            skip: obj.get("skip").and_then(as_usize),
            count: obj.get("count").map(as_flag).unwrap_or(false),
            fields,
        }
    }

    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    pub fn bind(mut self, value: JsonValue) -> Self {
        self.params.push(value);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            descending,
        });
        self
    }

    pub fn page(mut self, page: usize, records_per_page: usize) -> Self {
        self.page = Some(page);
        self.records_per_page = Some(records_per_page);
        self
    }

    /// Resolve paging into `(offset, limit)`
    ///
    /// `page` only applies when a page size is known, either from
    /// `recordsPerPage` or from the store default. The limit never exceeds
    /// `max_per_page`.
    pub fn window(&self, default_per_page: Option<usize>, max_per_page: usize) -> (usize, usize) {
        let per_page = self.records_per_page.or(default_per_page);
        let limit = per_page.unwrap_or(max_per_page).min(max_per_page);

        let page_offset = match (self.page, per_page) {
            (Some(page), Some(size)) => page.saturating_mul(size),
            _ => 0,
        };

        (self.skip.unwrap_or(0).saturating_add(page_offset), limit)
    }
}

fn as_usize(value: &JsonValue) -> Option<usize> {
    match value {
        JsonValue::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_flag(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
