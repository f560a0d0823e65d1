use serde::{Deserialize, Serialize};

/// `{name, id}` pointer to another object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenApiReference {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

impl OpenApiReference {
    pub fn from_id(id: impl Into<String>) -> Self {
        Self { name: String::new(), id: id.into() }
    }
}

/// One page of a paged list endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default)]
    pub result_total: Option<u32>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub page_count: u32,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
}

fn first_page() -> u32 {
    1
}
