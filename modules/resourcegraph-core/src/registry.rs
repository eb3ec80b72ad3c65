//! The process-wide metadata registry: an append-only store of
//! [`AdapterMetadata`] populated at startup, read-only thereafter.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use thiserror::Error;

use crate::metadata::AdapterMetadata;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("adapter metadata for type {0:?} is already registered")]
    DuplicateType(String),
    #[error("invalid adapter metadata for type {0:?}: {1}")]
    Invalid(String, String),
}

fn store() -> &'static Mutex<HashMap<String, AdapterMetadata>> {
    static STORE: OnceLock<Mutex<HashMap<String, AdapterMetadata>>> = OnceLock::new();
    STORE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Schema validation applied to every descriptor before it is admitted:
/// the type name must be non-empty and every declared link type must be
/// unique (a superset listed twice is very likely a copy-paste mistake,
/// not a real duplicate link).
fn validate(metadata: &AdapterMetadata) -> Result<(), RegistryError> {
    if metadata.item_type.is_empty() {
        return Err(RegistryError::Invalid(
            metadata.item_type.clone(),
            "type must be non-empty".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for link in &metadata.potential_links {
        if !seen.insert(link) {
            return Err(RegistryError::Invalid(
                metadata.item_type.clone(),
                format!("duplicate potential link type {link:?}"),
            ));
        }
    }
    Ok(())
}

/// Registers a descriptor. Fails (fatal initialisation error, per spec.md
/// §9) if the type is already registered or fails schema validation.
pub fn register(metadata: AdapterMetadata) -> Result<(), RegistryError> {
    validate(&metadata)?;
    let mut guard = store().lock().expect("registry mutex poisoned");
    if guard.contains_key(&metadata.item_type) {
        return Err(RegistryError::DuplicateType(metadata.item_type));
    }
    guard.insert(metadata.item_type.clone(), metadata);
    Ok(())
}

/// Read-only lookup, available at any time after init.
pub fn get(item_type: &str) -> Option<AdapterMetadata> {
    store().lock().expect("registry mutex poisoned").get(item_type).cloned()
}

pub fn all() -> Vec<AdapterMetadata> {
    store()
        .lock()
        .expect("registry mutex poisoned")
        .values()
        .cloned()
        .collect()
}
