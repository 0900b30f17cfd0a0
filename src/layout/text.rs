//! Greedy character-level line wrapping
//!
//! Lines are grown one character at a time. When the next character would push
//! the running line past `max_width`, the line is closed and the character
//! starts a new one. Words are never kept together, which is what scripts
//! without word boundaries need anyway.

/// Result of wrapping a string
#[derive(Clone, Debug, PartialEq)]
pub struct WrappedLines {
    pub lines: Vec<String>,
}

impl WrappedLines {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

/// Wrap `text` so each line measures at most `max_width`.
///
/// A character that is wider than `max_width` on its own still goes onto an
/// empty line. The empty string yields a single empty line.
pub fn wrap_lines<F>(text: &str, max_width: f64, measure: F) -> WrappedLines
where
    F: Fn(&str) -> f64,
{
    let mut lines = Vec::new();
    let mut line = String::new();

    for ch in text.chars() {
        let mut candidate = line.clone();
        candidate.push(ch);

        if !line.is_empty() && measure(&candidate) > max_width {
            lines.push(std::mem::take(&mut line));
            line.push(ch);
        } else {
            line = candidate;
        }
    }
    lines.push(line);

    WrappedLines { lines }
}

/// Number of lines `text` wraps into, used for auto height
pub fn count_lines<F>(text: &str, max_width: f64, measure: F) -> usize
where
    F: Fn(&str) -> f64,
{
    wrap_lines(text, max_width, measure).line_count()
}
