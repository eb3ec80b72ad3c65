//! Scope identifiers: the security/visibility boundary of a query.
//!
//! A scope is `"{accountId}.{region}"`, or `"global"` for region-less
//! resources, or just `"{accountId}"` for account-global resources.

use std::fmt;

/// `^[^.]+(\.[^.]+)?$|^global$`, enforced structurally rather than by regex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
pub struct Scope(String);

impl Scope {
    pub fn global() -> Self {
        Self("global".to_string())
    }

    /// `FormatScope(account, region) -> string`: `account` if region is
    /// empty, else `account.region`.
    pub fn format(account_id: &str, region: &str) -> Self {
        if region.is_empty() {
            Self(account_id.to_string())
        } else {
            Self(format!("{account_id}.{region}"))
        }
    }

    /// Parses a raw scope string, rejecting anything with more than one dot
    /// (excepting the literal `"global"`).
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidScope> {
        let raw = raw.into();
        if raw == "global" {
            return Ok(Self(raw));
        }
        if raw.is_empty() {
            return Err(InvalidScope(raw));
        }
        match raw.splitn(3, '.').count() {
            1 | 2 => Ok(Self(raw)),
            _ => Err(InvalidScope(raw)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn account_id(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    pub fn region(&self) -> Option<&str> {
        if self.0 == "global" {
            return None;
        }
        self.0.splitn(2, '.').nth(1)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Scope {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Scope {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid scope: {0:?}")]
pub struct InvalidScope(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_region_less() {
        assert_eq!(Scope::format("12345", "").as_str(), "12345");
    }

    #[test]
    fn format_with_region() {
        assert_eq!(
            Scope::format("12345", "eu-west-2").as_str(),
            "12345.eu-west-2"
        );
    }

    #[test]
    fn parse_global() {
        assert_eq!(Scope::parse("global").unwrap().as_str(), "global");
    }

    #[test]
    fn parse_rejects_too_many_segments() {
        assert!(Scope::parse("a.b.c").is_err());
    }

    #[test]
    fn account_id_and_region() {
        let s = Scope::parse("12345.eu-west-2").unwrap();
        assert_eq!(s.account_id(), "12345");
        assert_eq!(s.region(), Some("eu-west-2"));
    }

    #[test]
    fn global_has_no_region() {
        assert_eq!(Scope::global().region(), None);
    }
}
