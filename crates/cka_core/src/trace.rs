use serde::{Deserialize, Serialize};

/// Ordered, human-readable log of one pipeline run.
///
/// This is what the caller sees; each line is also mirrored as a `tracing` event with target
/// `clinicalkey::trace` so a subscriber can record the same information.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Trace {
    lines: Vec<String>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: "clinicalkey::trace", "{line}");
        self.lines.push(line);
    }

    /// Same as `push`, but the mirrored event is emitted at WARN level.
    pub fn warn(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::warn!(target: "clinicalkey::trace", "{line}");
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}
