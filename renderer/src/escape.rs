//! HTML escaping for text content and attribute values.

/// Escape text for HTML element content: `&`, `<`, `>`.
pub fn escape_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape text for a double-quoted HTML attribute value.
pub fn escape_attr(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Reverse [`escape_text`]/[`escape_attr`] for the entities they emit.
/// `&amp;` must be decoded last so `&amp;lt;` round-trips to `&lt;`.
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(escape_text("\"quoted\""), "\"quoted\"");
    }

    #[test]
    fn test_escape_attr_quotes() {
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn test_round_trip() {
        for original in ["a < b", "x & y", "<tag attr=\"v\">", "&amp; already"] {
            assert_eq!(unescape(&escape_text(original)), original);
            assert_eq!(unescape(&escape_attr(original)), original);
        }
    }

    #[test]
    fn test_no_double_escaping_on_unescape() {
        assert_eq!(unescape("&amp;lt;"), "&lt;");
    }
}
