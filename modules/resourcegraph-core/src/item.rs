//! The normalised `Item` record and its linked-item queries.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::scope::Scope;

/// A structured attribute value of arbitrary depth, mirroring the shape a
/// JSON-ish cloud API response is mapped into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

/// `GET | LIST | SEARCH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueryMethod {
    Get,
    List,
    Search,
}

impl fmt::Display for QueryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMethod::Get => write!(f, "get"),
            QueryMethod::List => write!(f, "list"),
            QueryMethod::Search => write!(f, "search"),
        }
    }
}

impl FromStr for QueryMethod {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Self::Get),
            "list" => Ok(Self::List),
            "search" => Ok(Self::Search),
            other => Err(format!("unknown QueryMethod: {other}")),
        }
    }
}

/// `OK | PENDING | ERROR | UNKNOWN`. Deliberately absent (not `Unknown`) for
/// terminal lifecycle states — see [`crate::health`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Ok,
    Pending,
    Error,
    Unknown,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Health::Ok => write!(f, "ok"),
            Health::Pending => write!(f, "pending"),
            Health::Error => write!(f, "error"),
            Health::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for Health {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "pending" => Ok(Self::Pending),
            "error" => Ok(Self::Error),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown Health: {other}")),
        }
    }
}

/// Whether changes flow inward to (`in`) / outward from (`out`) the linked
/// item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BlastPropagation {
    pub in_: bool,
    pub out: bool,
}

impl BlastPropagation {
    pub const fn new(in_: bool, out: bool) -> Self {
        Self { in_, out }
    }
}

/// A parameterised pointer to a related resource, annotated with blast
/// propagation direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LinkedItemQuery {
    pub query_type: String,
    pub method: QueryMethod,
    pub query_string: String,
    pub scope: Scope,
    pub blast_propagation: BlastPropagation,
}

/// A normalised resource record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub item_type: String,
    pub unique_attribute: String,
    pub scope: Scope,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub tags: BTreeMap<String, String>,
    pub health: Option<Health>,
    pub linked_item_queries: Vec<LinkedItemQuery>,
    /// When this item was produced by its adapter, not when it was cached.
    pub fetched_at: chrono::DateTime<chrono::Utc>,
}

impl Item {
    pub fn new(item_type: impl Into<String>, unique_attribute: impl Into<String>, scope: Scope) -> Self {
        Self {
            item_type: item_type.into(),
            unique_attribute: unique_attribute.into(),
            scope,
            attributes: BTreeMap::new(),
            tags: BTreeMap::new(),
            health: None,
            linked_item_queries: Vec::new(),
            fetched_at: chrono::Utc::now(),
        }
    }

    pub fn with_fetched_at(mut self, at: chrono::DateTime<chrono::Utc>) -> Self {
        self.fetched_at = at;
        self
    }

    /// The value of the item's unique attribute, used by `useListForGet`
    /// post-filtering. Invariant 2: present and non-empty.
    pub fn unique_attribute_value(&self) -> Option<&str> {
        self.attributes
            .get(&self.unique_attribute)
            .and_then(AttributeValue::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_health(mut self, health: Option<Health>) -> Self {
        self.health = health;
        self
    }

    pub fn with_linked_item_query(mut self, query: LinkedItemQuery) -> Self {
        self.linked_item_queries.push(query);
        self
    }
}
