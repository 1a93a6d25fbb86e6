/// Escape text for Telegram-style HTML (`<`, `>`, `&`, `"`).
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wrap already-plain text in a preformatted block, escaping it.
pub fn preformatted(text: &str) -> String {
    format!("<pre>{}</pre>", escape_html(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn preformatted_escapes_contents() {
        assert_eq!(preformatted("a<b"), "<pre>a&lt;b</pre>");
    }
}
