//! Canonical cloud resource identifiers: `arn:<partition>:<service>:<region>:<account>:<type>/<id>`.

use std::fmt;

use crate::error::{QueryError, QueryErrorKind};
use crate::scope::Scope;

/// A parsed six-field ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account_id: String,
    resource_type: String,
    resource_id: String,
}

impl Arn {
    /// Strict parse of the canonical form. Surfaces `OTHER` on malformed input.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let malformed = || {
            QueryError::new(
                QueryErrorKind::Other,
                Scope::global(),
                format!("malformed ARN: {raw:?}"),
            )
        };

        let mut parts = raw.splitn(6, ':');
        let literal = parts.next().ok_or_else(malformed)?;
        if literal != "arn" {
            return Err(malformed());
        }
        let partition = parts.next().ok_or_else(malformed)?.to_string();
        let service = parts.next().ok_or_else(malformed)?.to_string();
        let region = parts.next().ok_or_else(malformed)?.to_string();
        let account_id = parts.next().ok_or_else(malformed)?.to_string();
        let resource = parts.next().ok_or_else(malformed)?;
        if resource.is_empty() {
            return Err(malformed());
        }

        let (resource_type, resource_id) = match resource.split_once('/') {
            Some((t, id)) => (t.to_string(), id.to_string()),
            None => match resource.rsplit_once(':') {
                Some((t, id)) => (t.to_string(), id.to_string()),
                None => (String::new(), resource.to_string()),
            },
        };

        Ok(Self {
            partition,
            service,
            region,
            account_id,
            resource_type,
            resource_id,
        })
    }

    /// After the `type/` separator; for ARNs without a `/` the remainder
    /// after the last `:`.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn contains_wildcard(&self) -> bool {
        let fields = [
            self.partition.as_str(),
            self.service.as_str(),
            self.region.as_str(),
            self.account_id.as_str(),
            self.resource_type.as_str(),
            self.resource_id.as_str(),
        ];
        fields
            .iter()
            .any(|f| f.contains('*') || f.contains('?'))
    }

    pub fn scope(&self) -> Scope {
        Scope::format(&self.account_id, &self.region)
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.resource_type.is_empty() {
            write!(
                f,
                "arn:{}:{}:{}:{}:{}",
                self.partition, self.service, self.region, self.account_id, self.resource_id
            )
        } else {
            write!(
                f,
                "arn:{}:{}:{}:{}:{}/{}",
                self.partition,
                self.service,
                self.region,
                self.account_id,
                self.resource_type,
                self.resource_id
            )
        }
    }
}
