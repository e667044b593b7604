/// Escapes text for an HTML body or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut s = String::with_capacity(text.len());

    text.chars().for_each(|c| match c {
        '&' => s.push_str("&amp;"),
        '<' => s.push_str("&lt;"),
        '>' => s.push_str("&gt;"),
        '"' => s.push_str("&quot;"),
        '\'' => s.push_str("&#39;"),
        _ => s.push(c),
    });

    s
}

pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("삼성전자"), "삼성전자");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("  \t"));
        assert!(!is_blank(" x "));
    }
}
