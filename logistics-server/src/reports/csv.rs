//! CSV encoding helpers
//!
//! RFC-4180-style quoting: a field containing a quote, comma or newline is
//! wrapped in quotes with embedded quotes doubled. Everything else passes
//! through unchanged.

/// Escape a single CSV field
pub fn csv_escape(value: &str) -> String {
    if value.contains('"') || value.contains(',') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Join fields into one CSV line (with trailing newline)
pub fn csv_line<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = fields
        .into_iter()
        .map(|f| csv_escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

/// Render an optional millis timestamp as RFC 3339, empty when absent
pub fn csv_timestamp(millis: Option<i64>) -> String {
    millis
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_pass_through() {
        assert_eq!(csv_escape("Kathmandu"), "Kathmandu");
        assert_eq!(csv_escape(""), "");
        assert_eq!(csv_escape("1234.5"), "1234.5");
    }

    #[test]
    fn special_characters_are_quoted() {
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("cr\rlf"), "\"cr\rlf\"");
    }

    #[test]
    fn line_joins_and_terminates() {
        assert_eq!(csv_line(["a", "b,c", "d"]), "a,\"b,c\",d\n");
    }

    #[test]
    fn timestamps_render_rfc3339_or_empty() {
        assert_eq!(csv_timestamp(None), "");
        let rendered = csv_timestamp(Some(0));
        assert!(rendered.starts_with("1970-01-01T00:00:00"));
    }
}
