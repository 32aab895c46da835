use regex::Regex;
use std::sync::OnceLock;

fn line_break_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"))
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<.*?>").expect("valid regex"))
}

/// Converts a rich-text mod description into plain text.
///
/// Entities are decoded first, then `<br>` becomes a newline and any remaining tag is dropped.
pub fn to_plain_text(html: &str) -> String {
    let decoded = html_escape::decode_html_entities(html);
    let with_newlines = line_break_pattern().replace_all(&decoded, "\n");
    let stripped = tag_pattern().replace_all(&with_newlines, "");
    stripped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_line_breaks() {
        let html = "<p>Adds <b>new</b> stages.<br>Works with v1.2<BR/>Enjoy!</p>";
        assert_eq!(to_plain_text(html), "Adds new stages.\nWorks with v1.2\nEnjoy!");
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(to_plain_text("Fish&nbsp;&amp;&nbsp;Chips &#33;"), "Fish\u{a0}&\u{a0}Chips !");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(to_plain_text("  <div>\n hello \n</div>  "), "hello");
    }
}
