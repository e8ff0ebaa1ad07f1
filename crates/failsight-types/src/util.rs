/// Convert a byte count to a human readable size.
///
/// Exactly 1024^n rolls over to the next unit: 1024 bytes formats as
/// "1.00 KB", not "1024.00 B".
pub fn human_file_size(size: u64) -> String {
    let mut value = size as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} PB", value)
}

/// Truncate a string to a maximum number of characters.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// First `n` non-empty trimmed lines of a block of text.
pub fn head_lines(text: &str, n: usize) -> Vec<&str> {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .take(n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_file_size_kb() {
        assert_eq!(human_file_size(1536), "1.50 KB");
    }

    #[test]
    fn test_human_file_size_mb() {
        assert_eq!(human_file_size(2097152), "2.00 MB");
    }

    #[test]
    fn test_human_file_size_unit_boundary() {
        assert_eq!(human_file_size(1023), "1023.00 B");
        assert_eq!(human_file_size(1024), "1.00 KB");
        assert_eq!(human_file_size(1024 * 1024), "1.00 MB");
    }

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn test_truncate_cuts_at_char_boundary() {
        assert_eq!(truncate("hello world", 5), "hello");
    }

    #[test]
    fn test_head_lines_skips_blanks() {
        let text = "first\n\n  \nsecond\nthird";
        assert_eq!(head_lines(text, 2), vec!["first", "second"]);
    }
}
