//! Line extraction helpers for flow records.

/// Indexed view over one file's source, for `line_of_code` lookups.
#[derive(Debug, Clone)]
pub struct SourceText {
    lines: Vec<String>,
}

impl SourceText {
    pub fn new(source: &str) -> Self {
        Self {
            lines: source.lines().map(str::to_owned).collect(),
        }
    }

    /// The trimmed text of a 1-based line, or an empty string when the line
    /// does not exist (e.g. a synthetic span).
    pub fn line(&self, line: u32) -> &str {
        if line == 0 {
            return "";
        }
        self.lines
            .get(line as usize - 1)
            .map(|l| l.trim())
            .unwrap_or("")
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}
