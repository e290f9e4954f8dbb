use super::acl::Acl;
use crate::core::{DocumentId, RecordId, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

pub type JsonMap = Map<String, JsonValue>;

/// Output shape for a serialized document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Data plus every system field, including the record reference
    Document,
    /// Data plus system fields, without the record reference
    Json,
}

/// Field names owned by the store
pub const ID_FIELD: &str = "id";
pub const VERSION_FIELD: &str = "@version";

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: DocumentId,
    rid: RecordId,
    collection: String,
    version: u64,
    author: String,
    created_at: DateTime<Utc>,
    data: JsonMap,
    acl: Acl,
}

#[derive(Serialize)]
struct DocumentView<'a> {
    #[serde(rename = "@rid", skip_serializing_if = "Option::is_none")]
    rid: Option<String>,
    #[serde(rename = "@class")]
    class: &'a str,
    #[serde(rename = "@version")]
    version: u64,
    id: String,
    #[serde(rename = "_author")]
    author: &'a str,
    #[serde(rename = "_creation_date")]
    created_at: &'a DateTime<Utc>,
    #[serde(flatten)]
    data: &'a JsonMap,
}

impl Document {
    pub(crate) fn new(
        id: DocumentId,
        rid: RecordId,
        collection: &str,
        author: &str,
        data: JsonMap,
    ) -> Self {
        Self {
            id,
            rid,
            collection: collection.to_string(),
            version: 1,
            author: author.to_string(),
            created_at: Utc::now(),
            data,
            acl: Acl::new(),
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn rid(&self) -> RecordId {
        self.rid
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn data(&self) -> &JsonMap {
        &self.data
    }

    pub fn acl(&self) -> &Acl {
        &self.acl
    }

    pub(crate) fn acl_mut(&mut self) -> &mut Acl {
        &mut self.acl
    }

    /// Replace the content and bump the version
    pub(crate) fn replace_data(&mut self, data: JsonMap) {
        self.data = data;
        self.version += 1;
    }

    /// Serialize data and system fields into one JSON object
    pub fn to_json(&self, format: DocumentFormat) -> StoreResult<JsonValue> {
        let view = DocumentView {
            rid: match format {
                DocumentFormat::Document => Some(self.rid.to_string()),
                DocumentFormat::Json => None,
            },
            class: &self.collection,
            version: self.version,
            id: self.id.to_string(),
            author: &self.author,
            created_at: &self.created_at,
            data: &self.data,
        };

        Ok(serde_json::to_value(view)?)
    }
}

/// Strip store-owned fields from incoming data
///
/// Returns the cleaned content and the `@version` the caller based its update
/// on, if any. `id` is tolerated only when it names `expected_id`; any other
/// `@` or `_` prefixed field is reserved for the store.
pub(crate) fn split_system_fields(
    data: &JsonMap,
    expected_id: Option<&DocumentId>,
) -> StoreResult<(JsonMap, Option<u64>)> {
    let mut content = JsonMap::new();
    let mut version = None;

    for (key, value) in data {
        match key.as_str() {
            VERSION_FIELD => {
                let supplied = value.as_u64().ok_or_else(|| {
                    StoreError::InvalidModel(format!("{} must be a non-negative integer", VERSION_FIELD))
                })?;
                version = Some(supplied);
            }
            ID_FIELD => {
                let matches = match (value.as_str(), expected_id) {
                    (Some(given), Some(expected)) => {
                        DocumentId::parse(given).is_ok_and(|given| &given == expected)
                    }
                    _ => false,
                };
                if !matches {
                    return Err(StoreError::InvalidModel(
                        "field 'id' cannot be set or changed".to_string(),
                    ));
                }
            }
            reserved if reserved.starts_with('@') || reserved.starts_with('_') => {
                return Err(StoreError::InvalidModel(format!(
                    "field '{}' is reserved",
                    reserved
                )));
            }
            _ => {
                content.insert(key.clone(), value.clone());
            }
        }
    }

    Ok((content, version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Document {
        let data = json!({"title": "hello", "tags": ["a", "b"]});
        Document::new(
            DocumentId::new_v4(),
            RecordId::new(3, 0),
            "posts",
            "alice",
            data.as_object().unwrap().clone(),
        )
    }

    #[test]
    fn test_document_format() {
        let doc = sample();
        let json = doc.to_json(DocumentFormat::Document).unwrap();

        assert_eq!(json["@rid"], "#3:0");
        assert_eq!(json["@class"], "posts");
        assert_eq!(json["@version"], 1);
        assert_eq!(json["_author"], "alice");
        assert_eq!(json["id"], doc.id().to_string());
        assert_eq!(json["title"], "hello");
        assert!(json["_creation_date"].is_string());
    }

    #[test]
    fn test_json_format_hides_rid() {
        let json = sample().to_json(DocumentFormat::Json).unwrap();
        assert!(json.get("@rid").is_none());
        assert_eq!(json["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_replace_data_bumps_version() {
        let mut doc = sample();
        doc.replace_data(json!({"title": "bye"}).as_object().unwrap().clone());
        assert_eq!(doc.version(), 2);
        assert_eq!(doc.data()["title"], "bye");
        assert!(doc.data().get("tags").is_none());
    }

    #[test]
    fn test_split_system_fields() {
        let id = DocumentId::new_v4();
        let data = json!({"@version": 4, "id": id.to_string(), "title": "x"});
        let (content, version) = split_system_fields(data.as_object().unwrap(), Some(&id)).unwrap();

        assert_eq!(version, Some(4));
        assert_eq!(content.len(), 1);
        assert_eq!(content["title"], "x");
    }

    #[test]
    fn test_split_rejects_reserved_fields() {
        let reserved = json!({"@class": "other"});
        assert!(matches!(
            split_system_fields(reserved.as_object().unwrap(), None),
            Err(StoreError::InvalidModel(_))
        ));

        let foreign_id = json!({"id": DocumentId::new_v4().to_string()});
        assert!(matches!(
            split_system_fields(foreign_id.as_object().unwrap(), Some(&DocumentId::new_v4())),
            Err(StoreError::InvalidModel(_))
        ));

        let bad_version = json!({"@version": "two"});
        assert!(matches!(
            split_system_fields(bad_version.as_object().unwrap(), None),
            Err(StoreError::InvalidModel(_))
        ));
    }
}
