//! SQL identifier quoting utilities
//!
//! Provides safe quoting for SQL identifiers and string literals so dynamic
//! statements built from table names and file paths cannot be injected into.

/// Double-quote an identifier, doubling embedded quotes.
///
/// ```
/// use kf_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("courses"), r#""courses""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote each part of a `schema.table` name.
///
/// ```
/// use kf_core::sql_utils::quote_qualified;
/// assert_eq!(quote_qualified("main.feedbacks"), r#""main"."feedbacks""#);
/// ```
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a potentially schema-qualified table name into (schema, table).
///
/// Uses the last `.` as the separator and defaults the schema to `main`.
pub fn split_qualified_name(name: &str) -> (&str, &str) {
    if let Some(pos) = name.rfind('.') {
        (&name[..pos], &name[pos + 1..])
    } else {
        ("main", name)
    }
}

/// Escape a value for use inside a single-quoted literal, such as a CSV path
/// passed to `read_csv`.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Whether `name` is a plain identifier: ASCII letters, digits and
/// underscores, not starting with a digit.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
