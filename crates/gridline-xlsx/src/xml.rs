//! Small text helpers shared by the XML writers.

/// Escape character data.
pub(crate) fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Escape an attribute value.
pub(crate) fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;").replace('\'', "&apos;")
}

/// `<t>` payloads with leading/trailing whitespace need `xml:space`.
pub(crate) fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}

/// Format a float the way the producer writes numeric attributes and values:
/// the shortest representation that round-trips through `f64`.
pub(crate) fn format_f64(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping() {
        assert_eq!(escape_text("a<b&c>d"), "a&lt;b&amp;c&gt;d");
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn float_formatting() {
        assert_eq!(format_f64(42.0), "42");
        assert_eq!(format_f64(0.5), "0.5");
        assert_eq!(format_f64(-3.0), "-3");
    }
}
