use unicode_width::UnicodeWidthChar;

use url::Url;

/// Safely truncate a string, ensuring it is not truncated in the middle of multi-byte characters
///
/// The output's display width, ellipsis included, never exceeds `max_width`.
#[allow(dead_code)]
pub fn truncate_str(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(1);

        if current_width + char_width + 3 > max_width {
            break;
        }

        result.push(c);
        current_width += char_width;
    }

    result.push_str("...");
    result
}

/// Truncates `s` to at most `max_chars` characters, preferring to cut at the
/// last space at or before the limit, and appends `...` when anything was cut.
pub fn truncate_words(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }

    // One extra char so a space sitting exactly on the limit counts as a boundary
    let window: String = s.chars().take(max_chars + 1).collect();
    let hard_end = window
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(window.len());
    let end = window.rfind(' ').unwrap_or(hard_end);

    format!("{}...", &window[..end])
}

/// Absent, empty and whitespace-only values are blank.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

pub fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolves a possibly relative reference against the page it was found on.
pub fn absolutize(base: &Url, reference: &str) -> String {
    base.join(reference.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| reference.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("Hello, world!", 10), "Hello, ...");
        assert_eq!(truncate_str("你好，世界！", 8), "你好...");
        assert_eq!(truncate_str("Hi!", 10), "Hi!");
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("short", 10), "short");
        assert_eq!(truncate_words("hello brave new world", 11), "hello brave...");
        assert_eq!(truncate_words("hello brave new world", 8), "hello...");
        assert_eq!(truncate_words("abcdefghij", 4), "abcd...");
        assert_eq!(truncate_words("héllo wörld", 7), "héllo...");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(None));
        assert!(is_blank(Some("")));
        assert!(is_blank(Some("  \t\n")));
        assert!(!is_blank(Some(" x ")));
    }

    #[test]
    fn test_absolutize() {
        let base = Url::parse("https://example.com/posts/1").unwrap();
        assert_eq!(absolutize(&base, "/img/a.png"), "https://example.com/img/a.png");
        assert_eq!(
            absolutize(&base, "https://cdn.example.net/a.png"),
            "https://cdn.example.net/a.png"
        );
    }
}
