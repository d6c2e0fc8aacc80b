//! Splitting source text into statement lines.

use crate::config::LineJoining;

/// Lazy iterator over the statement lines of a source text.
///
/// Empty lines and `//` comments are dropped, and trailing `//` comments and
/// a trailing `;` are stripped. Each remaining line is one statement unless
/// the iterator was built with [`joined`](Self::joined), in which case a line
/// that leaves a bracket open is joined with the following lines until the
/// brackets balance. Cloning the iterator lets a caller replay from the
/// current position.
///
/// ```
/// use qconsole::source::StatementLines;
///
/// let source = "x: 1\n// note\n\nt: ([]\n  a: 1 2\n);";
/// let lines: Vec<String> = StatementLines::new(source).collect();
/// assert_eq!(lines, vec!["x: 1", "t: ([]", "a: 1 2", ")"]);
///
/// let joined: Vec<String> = StatementLines::joined(source).collect();
/// assert_eq!(joined, vec!["x: 1", "t: ([] a: 1 2 )"]);
/// ```
#[derive(Debug, Clone)]
pub struct StatementLines<'a> {
    lines: std::str::Lines<'a>,
    joining: LineJoining,
}

impl<'a> StatementLines<'a> {
    /// One statement per non-empty line.
    pub fn new(source: &'a str) -> Self {
        Self::with_joining(source, LineJoining::PerLine)
    }

    /// Statements continue across lines while a bracket is open.
    pub fn joined(source: &'a str) -> Self {
        Self::with_joining(source, LineJoining::Brackets)
    }

    pub fn with_joining(source: &'a str, joining: LineJoining) -> Self {
        StatementLines {
            lines: source.lines(),
            joining,
        }
    }
}

impl Iterator for StatementLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut statement = loop {
            let line = strip_comment(self.lines.next()?).trim();
            if !line.is_empty() {
                break line.to_string();
            }
        };

        while self.joining == LineJoining::Brackets && bracket_depth(&statement) > 0 {
            let Some(raw) = self.lines.next() else { break };
            let continuation = strip_comment(raw).trim();
            if continuation.is_empty() {
                continue;
            }
            statement.push(' ');
            statement.push_str(continuation);
        }

        let statement = statement.strip_suffix(';').unwrap_or(&statement).trim_end();
        Some(statement.to_string())
    }
}

/// Cuts a `//` comment that is not inside a string literal.
pub fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    let mut previous_slash = false;

    for (i, ch) in line.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '/' if previous_slash => return &line[..i - 1],
            _ => {}
        }
        previous_slash = ch == '/';
    }
    line
}

/// Open minus closed brackets of all three kinds, ignoring string literals.
pub fn bracket_depth(text: &str) -> i32 {
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    depth
}
