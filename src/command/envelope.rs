//! Command envelope and its parameter extractors
//!
//! Every extractor is side-effect free and reports a `Parsing` error, so a
//! handler that pulls all of its inputs first never touches the store with a
//! malformed command.

use super::error::{CommandError, CommandResult};
use crate::core::DocumentId;
use crate::query::QueryParams;
use crate::storage::JsonMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const COLLECTION_PARAM: &str = "collection";
pub const ID_PARAM: &str = "id";
pub const DATA_PARAM: &str = "data";
pub const QUERY_PARAM: &str = "query";

/// `{resource, name, params}` as submitted by a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    resource: String,
    name: String,
    #[serde(default)]
    params: JsonMap,
}

impl CommandEnvelope {
    pub fn new(resource: impl Into<String>, name: impl Into<String>, params: JsonMap) -> Self {
        Self {
            resource: resource.into(),
            name: name.into(),
            params,
        }
    }

    /// Check the envelope shape and take ownership of its parts
    ///
    /// `params` may be omitted or `null`; anything else must be an object.
    pub fn from_json(value: JsonValue) -> CommandResult<Self> {
        let JsonValue::Object(mut obj) = value else {
            return Err(CommandError::parsing("command must be a json object"));
        };

        let resource = take_string(&mut obj, "resource")?;
        let name = take_string(&mut obj, "name")?;

        let params = match obj.remove("params") {
            None | Some(JsonValue::Null) => JsonMap::new(),
            Some(JsonValue::Object(params)) => params,
            Some(other) => {
                return Err(CommandError::parsing(format!(
                    "params must be an object, found: {}",
                    other
                )));
            }
        };

        Ok(Self {
            resource,
            name,
            params,
        })
    }

    pub fn parse(input: &str) -> CommandResult<Self> {
        let value: JsonValue = serde_json::from_str(input)
            .map_err(|e| CommandError::parsing(format!("invalid command json: {}", e)))?;
        Self::from_json(value)
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &JsonMap {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&JsonValue> {
        self.params.get(key)
    }

    /// `params.collection`, required and textual
    pub fn collection(&self) -> CommandResult<&str> {
        match self.param(COLLECTION_PARAM) {
            Some(JsonValue::String(name)) => Ok(name),
            Some(other) => Err(CommandError::parsing(format!(
                "invalid collection param: {}",
                other
            ))),
            None => Err(CommandError::parsing("invalid collection param: null")),
        }
    }

    /// `params.id`, required and a valid UUID
    pub fn document_id(&self) -> CommandResult<DocumentId> {
        let Some(JsonValue::String(id)) = self.param(ID_PARAM) else {
            return Err(CommandError::parsing("missing document id"));
        };

        DocumentId::parse(id).map_err(|_| {
            CommandError::parsing(format!("document id: {} must be a valid uuid", id))
        })
    }

    /// `params.data`, required and an object
    pub fn data(&self) -> CommandResult<&JsonMap> {
        match self.param(DATA_PARAM) {
            Some(JsonValue::Object(data)) => Ok(data),
            _ => Err(CommandError::parsing("missing required data parameter")),
        }
    }

    /// `params.query`, parsed permissively
    pub fn query(&self) -> QueryParams {
        QueryParams::from_json(self.param(QUERY_PARAM))
    }
}

fn take_string(obj: &mut JsonMap, key: &str) -> CommandResult<String> {
    match obj.remove(key) {
        Some(JsonValue::String(value)) => Ok(value),
        Some(other) => Err(CommandError::parsing(format!(
            "{} must be a string, found: {}",
            key, other
        ))),
        None => Err(CommandError::parsing(format!("missing {}", key))),
    }
}
