//! Strongly-typed table name wrapper.

use crate::sql_utils::{is_plain_identifier, quote_ident};
use std::fmt;

/// A validated, unqualified table name.
///
/// Only plain identifiers (ASCII letters, digits, underscores) are accepted,
/// so a `TableName` built from untrusted input, such as a URL path segment,
/// is always safe to splice into SQL once quoted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Try to create a new `TableName`, returning `None` if the name is not a
    /// plain identifier.
    pub fn try_new(name: impl Into<String>) -> Option<Self> {
        let s = name.into();
        if is_plain_identifier(&s) {
            Some(Self(s))
        } else {
            None
        }
    }

    /// Return the underlying name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name as a quoted SQL identifier.
    pub fn quoted(&self) -> String {
        quote_ident(&self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_creation() {
        let name = TableName::try_new("fact_training_kpis").unwrap();
        assert_eq!(name.as_str(), "fact_training_kpis");
        assert_eq!(name.to_string(), "fact_training_kpis");
    }

    #[test]
    fn test_table_name_rejects_non_identifiers() {
        assert!(TableName::try_new("").is_none());
        assert!(TableName::try_new("raw.orders").is_none());
        assert!(TableName::try_new("x\"; DROP TABLE y; --").is_none());
        assert!(TableName::try_new("../etc/passwd").is_none());
    }

    #[test]
    fn test_table_name_quoted() {
        let name = TableName::try_new("courses").unwrap();
        assert_eq!(name.quoted(), "\"courses\"");
    }
}
