//! Policy for caller-supplied SQL on the `/query` endpoints

use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Which statements `POST /query` accepts.
///
/// `GET /query` is always SELECT-only regardless of policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlPolicy {
    /// Only statements starting with SELECT
    SelectOnly,
    /// Any statement the database role is allowed to run
    #[default]
    Unrestricted,
}

impl SqlPolicy {
    pub fn check(&self, sql: &str) -> Result<(), ValidationError> {
        match self {
            Self::SelectOnly => require_select(sql),
            Self::Unrestricted => Ok(()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectOnly => "select-only",
            Self::Unrestricted => "unrestricted",
        }
    }
}

impl FromStr for SqlPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "select-only" | "select_only" | "readonly" => Ok(Self::SelectOnly),
            "unrestricted" | "any" => Ok(Self::Unrestricted),
            _ => Err(ValidationError::InvalidVariant {
                field: "sql policy",
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for SqlPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reject anything whose first keyword is not SELECT.
pub fn require_select(sql: &str) -> Result<(), ValidationError> {
    let first = sql
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(' || c == '*')
        .next()
        .unwrap_or_default();

    if first.eq_ignore_ascii_case("select") {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "sql",
            reason: "only SELECT statements are allowed",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_detection() {
        assert!(require_select("SELECT 1").is_ok());
        assert!(require_select("  select * from users").is_ok());
        assert!(require_select("select\n*\nfrom users").is_ok());
        assert!(require_select("SELECT*FROM users").is_ok());
        assert!(require_select("DELETE FROM users").is_err());
        assert!(require_select("selection").is_err());
        assert!(require_select("").is_err());
    }

    #[test]
    fn policy_check() {
        assert!(SqlPolicy::Unrestricted.check("DROP TABLE users").is_ok());
        assert!(SqlPolicy::SelectOnly.check("DROP TABLE users").is_err());
        assert!(SqlPolicy::SelectOnly.check("SELECT 1").is_ok());
    }

    #[test]
    fn parse_policy() {
        assert_eq!("select-only".parse::<SqlPolicy>().unwrap(), SqlPolicy::SelectOnly);
        assert_eq!("Unrestricted".parse::<SqlPolicy>().unwrap(), SqlPolicy::Unrestricted);
        assert!("whatever".parse::<SqlPolicy>().is_err());
    }
}
