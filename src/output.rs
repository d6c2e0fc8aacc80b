//! Rendering of results into styled display lines.
//!
//! Every value renders to exactly one [`DisplayLine`]; tables span several
//! text lines inside it. A line prints as plain text through [`Display`] or
//! as inline HTML through [`DisplayLine::markup`].
//!
//! # Examples
//!
//! ```
//! use qconsole::Value;
//! use qconsole::output::{Style, format_value};
//!
//! let line = format_value(&Value::List(vec![Value::Number(1.0), Value::Number(2.5)]));
//! assert_eq!(line.style, Style::Value);
//! assert_eq!(line.to_string(), "1 2.5");
//!
//! let sym = format_value(&Value::Symbol("AAPL".to_string()));
//! assert_eq!(sym.markup(), r#"<div class="text-white">`AAPL</div>"#);
//! ```
//!
//! [`Display`]: std::fmt::Display

use std::fmt;

use crate::value::{Table, Value, format_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Echo of the statement being evaluated
    Prompt,
    Value,
    Table,
    /// String results
    Text,
    Comment,
    Error,
}

impl Style {
    pub fn class(self) -> &'static str {
        match self {
            Style::Prompt => "text-[#0078d4]",
            Style::Value | Style::Table => "text-white",
            Style::Text => "text-[#ce9178]",
            Style::Comment => "text-[#6A9955]",
            Style::Error => "text-[#d83b01]",
        }
    }
}

/// One unit of interpreter output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub style: Style,
    pub text: String,
}

impl DisplayLine {
    pub fn new(style: Style, text: impl Into<String>) -> Self {
        DisplayLine {
            style,
            text: text.into(),
        }
    }

    pub fn prompt(statement: &str) -> Self {
        DisplayLine::new(Style::Prompt, statement)
    }

    pub fn comment(text: impl Into<String>) -> Self {
        DisplayLine::new(Style::Comment, text)
    }

    pub fn error(message: &str) -> Self {
        DisplayLine::new(Style::Error, format!("Error: {}", message))
    }

    /// Inline HTML for the line, text escaped.
    pub fn markup(&self) -> String {
        let text = escape_markup(&self.text);
        match self.style {
            Style::Prompt => format!(
                r#"<div class="{}"><span class="{}">q) </span>{}</div>"#,
                Style::Value.class(),
                Style::Prompt.class(),
                text
            ),
            Style::Table => format!(r#"<div class="{}"><pre>{}</pre></div>"#, self.style.class(), text),
            style => format!(
                r#"<div class="{}">{}</div>"#,
                style.class(),
                text.replace('\n', "<br>")
            ),
        }
    }
}

impl fmt::Display for DisplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.style {
            Style::Prompt => write!(f, "q) {}", self.text),
            _ => f.write_str(&self.text),
        }
    }
}

fn escape_markup(s: &str) -> String {
    s.chars()
        .fold(String::with_capacity(s.len()), |mut out, c| {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                c => out.push(c),
            }
            out
        })
}

pub fn format_value(value: &Value) -> DisplayLine {
    match value {
        Value::Text(s) => DisplayLine::new(Style::Text, format!("\"{}\"", s)),
        Value::Table(table) => DisplayLine::new(Style::Table, format_table(table)),
        Value::List(items) => DisplayLine::new(Style::Value, format_list(items)),
        atom => DisplayLine::new(Style::Value, format_atom(atom)),
    }
}

/// q literal form of an atom.
fn format_atom(value: &Value) -> String {
    match value {
        Value::Number(n) => format_number(*n),
        Value::Text(s) => format!("\"{}\"", s),
        Value::Symbol(s) => format!("`{}", s),
        other => other.as_string(),
    }
}

fn format_list(items: &[Value]) -> String {
    if items.is_empty() {
        return "()".to_string();
    }
    if items.iter().any(|item| !item.is_atom()) {
        let json = to_json(&Value::List(items.to_vec()));
        return serde_json::to_string(&json).unwrap_or_default();
    }
    if items.iter().all(|item| matches!(item, Value::Symbol(_))) {
        return items.iter().map(format_atom).collect();
    }
    items.iter().map(format_atom).collect::<Vec<_>>().join(" ")
}

/// Header, dash separator, then one line per row. Columns are padded to
/// their widest cell.
pub fn format_table(table: &Table) -> String {
    let cells: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(Value::as_string).collect())
        .collect();

    let widths: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(index, name)| {
            cells
                .iter()
                .map(|row| row[index].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |fields: &[String]| {
        fields
            .iter()
            .zip(&widths)
            .map(|(field, width)| format!("{:<width$}", field, width = width))
            .collect::<Vec<_>>()
            .join(" ")
            .trim_end()
            .to_string()
    };

    let total = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
    let mut lines = vec![render(table.columns()), "-".repeat(total)];
    lines.extend(cells.iter().map(|row| render(row.as_slice())));
    lines.join("\n")
}

/// Structural JSON form of a value. Tables become
/// `{"columns": [...], "rows": [[...]]}`; nulls and infinities become `null`.
pub fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Number(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
        Value::Boolean(b) => Json::Bool(*b),
        Value::Text(s) | Value::Symbol(s) | Value::Function(s) => Json::String(s.clone()),
        Value::Date(d) => Json::String(d.to_string()),
        Value::List(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Table(table) => serde_json::json!({
            "columns": table.columns(),
            "rows": table
                .rows()
                .iter()
                .map(|row| Json::Array(row.iter().map(to_json).collect()))
                .collect::<Vec<_>>(),
        }),
    }
}
