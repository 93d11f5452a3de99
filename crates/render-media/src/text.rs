//! Text-filter string helpers: DSL escaping and hex color conversion shared
//! by scene text overlays, global text overlays, and captions (§4.4.5).

/// Escape a string for embedding inside an ffmpeg filter argument.
/// Order matters: backslash must be escaped first or later escapes would
/// double-escape themselves.
pub fn escape_filter_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            ':' => out.push_str("\\:"),
            '[' => out.push_str("\\["),
            ']' => out.push_str("\\]"),
            '"' => out.push_str("\\\""),
            '%' => out.push_str("\\%"),
            ';' => out.push_str("\\;"),
            other => out.push(other),
        }
    }
    out
}

/// `#RRGGBB` -> ffmpeg's `0xRRGGBB` color literal.
pub fn hex_to_ffmpeg_color(hex: &str) -> String {
    let trimmed = hex.trim_start_matches('#');
    format!("0x{trimmed}")
}

/// An `enable=` gate for a time window, or none if the overlay has no
/// declared window (always visible).
pub fn visibility_expr(start_sec: Option<f64>, duration_sec: Option<f64>) -> Option<String> {
    match (start_sec, duration_sec) {
        (Some(start), Some(duration)) => Some(format!("between(t\\,{start}\\,{})", start + duration)),
        (Some(start), None) => Some(format!("gte(t\\,{start})")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_all_named_characters() {
        let input = r#"a\b'c:d[e]f"g%h;i"#;
        let escaped = escape_filter_text(input);
        assert_eq!(escaped, r#"a\\b\'c\:d\[e\]f\"g\%h\;i"#);
    }

    #[test]
    fn hex_color_drops_hash_and_adds_0x() {
        assert_eq!(hex_to_ffmpeg_color("#FFFFFF"), "0xFFFFFF");
        assert_eq!(hex_to_ffmpeg_color("000000"), "0x000000");
    }

    #[test]
    fn visibility_expr_uses_between_when_fully_bounded() {
        let expr = visibility_expr(Some(1.0), Some(2.0)).unwrap();
        assert_eq!(expr, "between(t\\,1\\,3)");
    }

    #[test]
    fn visibility_expr_is_none_when_unbounded() {
        assert!(visibility_expr(None, None).is_none());
    }
}
