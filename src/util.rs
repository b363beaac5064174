//! Small validation helpers shared by the server handlers and the dashboard form.

/// Parse a record identifier taken from a URL path segment.
///
/// Identifiers are store-assigned positive integers; anything else is rejected
/// here so that a malformed id never reaches the store.
pub fn parse_record_id(raw: &str) -> Result<i64, String> {
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("Invalid testimonial id: {:?}", raw))?;
    if id <= 0 {
        return Err(format!("Invalid testimonial id: {}", id));
    }
    Ok(id)
}

/// Reject values that are empty or whitespace-only.
pub fn validate_required(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(())
}

/// Parse a `Cookie` header value and return the named cookie, if present.
///
/// Example: `"theme=dark; testimonials.session_token=abc"` → `Some("abc")`
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name {
            Some(value.trim_matches('"'))
        } else {
            None
        }
    })
}
