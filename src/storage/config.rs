use serde::Deserialize;

/// Configuration for [`MemoryDocumentStore`](super::MemoryDocumentStore)
///
/// Deserializable so the CLI can load it from a JSON file; missing keys fall
/// back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Run injection checks on `where` clauses before parsing them
    pub validate_queries: bool,

    /// Create a collection on first `post` instead of rejecting it
    pub auto_create_collections: bool,

    /// Role whose members bypass document ACLs
    pub admin_role: String,

    /// Page size applied when a query gives `page` without `recordsPerPage`
    pub default_records_per_page: Option<usize>,

    /// Hard cap on documents returned by one `list`
    pub max_records_per_page: usize,
}

impl StoreConfig {
    pub const DEFAULT_ADMIN_ROLE: &'static str = "administrator";

    pub fn new() -> Self {
        Self {
            validate_queries: true,
            auto_create_collections: false,
            admin_role: Self::DEFAULT_ADMIN_ROLE.to_string(),
            default_records_per_page: None,
            max_records_per_page: 1000,
        }
    }

    pub fn validate_queries(mut self, enabled: bool) -> Self {
        self.validate_queries = enabled;
        self
    }

    pub fn auto_create_collections(mut self, enabled: bool) -> Self {
        self.auto_create_collections = enabled;
        self
    }

    pub fn admin_role(mut self, role: &str) -> Self {
        self.admin_role = role.to_string();
        self
    }

    pub fn default_records_per_page(mut self, size: usize) -> Self {
        self.default_records_per_page = Some(size);
        self
    }

    pub fn max_records_per_page(mut self, max: usize) -> Self {
        self.max_records_per_page = max;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.admin_role.is_empty() {
            return Err("admin_role cannot be empty".to_string());
        }

        if self.max_records_per_page == 0 {
            return Err("max_records_per_page must be > 0".to_string());
        }

        if let Some(size) = self.default_records_per_page {
            if size == 0 || size > self.max_records_per_page {
                return Err(
                    "default_records_per_page must be between 1 and max_records_per_page".to_string(),
                );
            }
        }

        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
