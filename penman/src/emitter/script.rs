//! Output sink for generated scripts.

use std::fmt;

/// Default banner width in characters.
pub const BANNER_WIDTH: usize = 100;

const BANNER_START: &str = "-- ";

/// One line of a generated script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLine {
    Blank,
    /// Section banner, already padded.
    Comment(String),
    /// Decorated statement, e.g. `select f_add_source_system(...);`.
    Statement(String),
}

impl fmt::Display for ScriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => Ok(()),
            Self::Comment(text) | Self::Statement(text) => f.write_str(text),
        }
    }
}

/// Section banner: `-- TITLE ` padded with dashes to `width` characters.
///
/// Titles longer than the width are kept whole, without padding.
pub fn banner(title: &str, width: usize) -> String {
    let mut line = format!("{}{}", BANNER_START, title);
    if !title.ends_with(' ') {
        line.push(' ');
    }
    let used = line.chars().count();
    line.push_str(&"-".repeat(width.saturating_sub(used)));
    line
}

/// Lines emitted so far, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<ScriptLine>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: ScriptLine) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            ScriptLine::Statement(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            ScriptLine::Comment(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
