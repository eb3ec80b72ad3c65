//! Static per-resource-kind descriptors and their registry.

use serde::{Deserialize, Serialize};

/// Human-readable description of a supported query method.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueryMethodSupport {
    pub supported: bool,
    pub description: String,
}

impl QueryMethodSupport {
    pub fn supported(description: impl Into<String>) -> Self {
        Self {
            supported: true,
            description: description.into(),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SupportedQueryMethods {
    pub get: QueryMethodSupport,
    pub list: QueryMethodSupport,
    pub search: QueryMethodSupport,
}

/// A Terraform resource mapping hint: which query to run to resolve a
/// Terraform-managed resource to the adapter's item.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TerraformMapping {
    pub terraform_type: String,
    pub query_map: String,
    pub method: crate::item::QueryMethod,
}

/// Static descriptor per resource kind, the authoritative capability record
/// consumed by the discovery runtime.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AdapterMetadata {
    #[serde(rename = "type")]
    pub item_type: String,
    pub descriptive_name: String,
    pub category: String,
    pub supported_query_methods: SupportedQueryMethods,
    /// Superset of every link type any item of this kind emits (invariant 5).
    pub potential_links: Vec<String>,
    pub terraform_mappings: Vec<TerraformMapping>,
}
