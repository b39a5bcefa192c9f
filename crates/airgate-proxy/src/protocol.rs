//! Wire types for `/v1/models`-shaped listings

use serde::{Deserialize, Deserializer, Serialize};

/// One model as advertised by an upstream account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(default = "default_object", deserialize_with = "nullable")]
    pub object: String,
    #[serde(default, deserialize_with = "nullable")]
    pub created: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub owned_by: String,
    #[serde(default, deserialize_with = "nullable")]
    pub supported_endpoint_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible_providers: Option<Vec<String>>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: default_object(),
            created: 0,
            owned_by: String::new(),
            supported_endpoint_types: Vec::new(),
            compatible_providers: None,
            kind: None,
            display_name: None,
        }
    }
}

/// Listing returned by an upstream `GET /models`
#[derive(Debug, Deserialize)]
pub struct UpstreamModelList {
    #[serde(default, deserialize_with = "nullable")]
    pub data: Vec<ModelDescriptor>,
}

/// Listing served by `GET /v1/models`
#[derive(Debug, Serialize)]
pub struct ModelList {
    pub data: Vec<ModelDescriptor>,
    pub object: &'static str,
    pub success: bool,
}

impl ModelList {
    pub const fn new(data: Vec<ModelDescriptor>) -> Self {
        Self {
            data,
            object: "list",
            success: true,
        }
    }
}

fn default_object() -> String {
    "model".to_owned()
}

/// Treat an explicit `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
