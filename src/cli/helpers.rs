//! Helper utilities for CLI commands.

use indicatif::ProgressStyle;

/// Truncate a string to a maximum number of characters, adding "..." if truncated.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Collapse whitespace runs so previews fit on one line.
pub fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Progress bar style shared by the chunk loop.
pub fn chunk_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate("ääääääää", 5), "ää...");
    }

    #[test]
    fn test_one_line() {
        assert_eq!(one_line("  TLP:CLEAR\n\nJoint   Advisory \t"), "TLP:CLEAR Joint Advisory");
    }
}
