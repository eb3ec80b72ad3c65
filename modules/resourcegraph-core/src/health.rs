//! Tag/health normalisers: convert tag slices to maps and fold per-service
//! lifecycle enums onto a common health ladder.

use std::collections::BTreeMap;

use crate::item::Health;

/// Converts an SDK's `(key, value)` tag pairs into the flat map `Item::tags`
/// expects. Duplicate keys keep the last-seen value, matching the common
/// "tags are a list but logically a map" SDK shape.
pub fn tags_to_map<I, K, V>(tags: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    tags.into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Folds a per-service lifecycle state string onto the common health ladder.
///
/// - `creating|updating|enabling|disabling|deleting|pending` -> `Pending`
/// - `available|inService|active|ok` -> `Ok`
/// - `error|failed` -> `Error`
/// - `outOfService` -> `Error`
/// - `terminated|stopped|deleted` -> `None` (deliberately absent)
/// - anything else -> `Unknown`
pub fn health_from_lifecycle_state(state: &str) -> Option<Health> {
    let normalised = state.to_ascii_lowercase();
    match normalised.as_str() {
        "creating" | "updating" | "enabling" | "disabling" | "deleting" | "pending" => {
            Some(Health::Pending)
        }
        "available" | "inservice" | "active" | "ok" => Some(Health::Ok),
        "error" | "failed" | "outofservice" => Some(Health::Error),
        "terminated" | "stopped" | "deleted" => None,
        _ => Some(Health::Unknown),
    }
}

/// As [`health_from_lifecycle_state`], but additionally folds a
/// `stateChangeError`-style optional reason string to `Error` regardless of
/// the nominal lifecycle state, matching SDKs that report both a status
/// enum and a separate error-reason field.
pub fn health_from_lifecycle(state: &str, state_change_error: Option<&str>) -> Option<Health> {
    if state_change_error.is_some() {
        return Some(Health::Error);
    }
    health_from_lifecycle_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_states() {
        for s in ["creating", "updating", "enabling", "disabling", "deleting", "pending"] {
            assert_eq!(health_from_lifecycle_state(s), Some(Health::Pending));
        }
    }

    #[test]
    fn ok_states() {
        for s in ["available", "inService", "active", "ok"] {
            assert_eq!(health_from_lifecycle_state(s), Some(Health::Ok));
        }
    }

    #[test]
    fn error_states() {
        for s in ["error", "failed", "outOfService"] {
            assert_eq!(health_from_lifecycle_state(s), Some(Health::Error));
        }
    }

    #[test]
    fn terminal_states_have_no_health() {
        for s in ["terminated", "stopped", "deleted"] {
            assert_eq!(health_from_lifecycle_state(s), None);
        }
    }

    #[test]
    fn unknown_state_is_unknown() {
        assert_eq!(health_from_lifecycle_state("frobnicating"), Some(Health::Unknown));
    }

    #[test]
    fn state_change_error_overrides_to_error() {
        assert_eq!(
            health_from_lifecycle("available", Some("boom")),
            Some(Health::Error)
        );
    }

    #[test]
    fn tags_to_map_keeps_last_duplicate() {
        let tags = tags_to_map(vec![("foo", "bar"), ("foo", "baz")]);
        assert_eq!(tags.get("foo"), Some(&"baz".to_string()));
    }
}
