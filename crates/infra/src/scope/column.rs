//! Logical field names to storage identifiers.

/// Map a logical field name (`ItemDetail`) to its column name (`item_detail`).
///
/// An underscore goes before every uppercase letter except the first character,
/// and a run of consecutive uppercase letters gets a single leading boundary.
pub fn column_name(logical: &str) -> String {
    let mut out = String::with_capacity(logical.len() + 4);
    let mut in_run = false;

    for (i, ch) in logical.chars().enumerate() {
        if ch.is_uppercase() && i != 0 {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            in_run = false;
        }
        out.extend(ch.to_lowercase());
    }

    out
}

/// Quote an identifier for Postgres, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
