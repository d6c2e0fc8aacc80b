//! Run scripts and interactive sessions against one interpreter

use std::io::{BufRead, Write};

use super::CliError;
use crate::{
    Interpreter, Value,
    output::format_value,
    source::{StatementLines, bracket_depth},
};

/// Evaluates a whole script, returning the rendered lines.
pub fn execute_script(interpreter: &mut Interpreter, source: &str, markup: bool) -> Vec<String> {
    if markup {
        interpreter.run_markup(source)
    } else {
        interpreter.run(source).iter().map(ToString::to_string).collect()
    }
}

/// Bound names as a symbol list, answered by the `\v` command.
pub fn list_variables(interpreter: &Interpreter, markup: bool) -> String {
    let names = interpreter
        .symbols()
        .names()
        .into_iter()
        .map(|name| Value::Symbol(name.to_string()))
        .collect();
    let line = format_value(&Value::List(names));
    if markup { line.markup() } else { line.to_string() }
}

/// Reads statements from `input` until EOF, printing results as they come.
///
/// A line that leaves a bracket open is buffered and the prompt changes to
/// `  ` until the statement is complete. `\v` lists the bound names.
pub fn repl<R: BufRead, W: Write>(
    interpreter: &mut Interpreter,
    input: R,
    output: &mut W,
    markup: bool,
) -> Result<(), CliError> {
    let mut pending = String::new();
    write!(output, "q) ")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(&line);

        if bracket_depth(&pending) > 0 {
            write!(output, "  ")?;
            output.flush()?;
            continue;
        }

        let buffered = std::mem::take(&mut pending);
        if buffered.trim() == "\\v" {
            writeln!(output, "{}", list_variables(interpreter, markup))?;
        } else {
            run_buffered(interpreter, &buffered, output, markup)?;
        }
        write!(output, "q) ")?;
        output.flush()?;
    }

    if !pending.trim().is_empty() {
        run_buffered(interpreter, &pending, output, markup)?;
    }
    writeln!(output)?;
    Ok(())
}

// Buffered lines form one statement whatever the interpreter's line joining.
fn run_buffered<W: Write>(
    interpreter: &mut Interpreter,
    buffered: &str,
    output: &mut W,
    markup: bool,
) -> Result<(), CliError> {
    for statement in StatementLines::joined(buffered) {
        for rendered in execute_script(interpreter, &statement, markup) {
            writeln!(output, "{}", rendered)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InterpreterConfig;

    #[test]
    fn test_repl_keeps_state_between_lines() {
        let mut interpreter = Interpreter::new(InterpreterConfig::default());
        let mut output = Vec::new();
        repl(&mut interpreter, "x: 2\nx * 21\n".as_bytes(), &mut output, false).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("// Assigned to variable: x"));
        assert!(text.contains("q) x * 21\n42\n"));
    }

    #[test]
    fn test_repl_buffers_open_brackets() {
        let mut interpreter = Interpreter::with_sample_data(InterpreterConfig::default());
        let mut output = Vec::new();
        repl(&mut interpreter, "t: ([]\n a: 1 2)\ncount t\n".as_bytes(), &mut output, false).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("// Assigned to variable: t"));
        assert!(text.ends_with("q) count t\n2\nq) \n"));
    }

    #[test]
    fn test_repl_joins_multi_line_function() {
        let mut interpreter = Interpreter::new(InterpreterConfig::default());
        let mut output = Vec::new();
        repl(&mut interpreter, "f: {x\n  x * 2\n}\n".as_bytes(), &mut output, false).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("// Function defined: f").count(), 1);
        assert!(!text.contains("Error"));
    }

    #[test]
    fn test_repl_lists_variables() {
        let mut interpreter = Interpreter::new(InterpreterConfig::default());
        let mut output = Vec::new();
        repl(&mut interpreter, "b: 1\na: 2\n\\v\n".as_bytes(), &mut output, false).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("q) `a`b\n"));
    }

    #[test]
    fn test_list_variables_when_empty() {
        let interpreter = Interpreter::new(InterpreterConfig::default());
        assert_eq!(list_variables(&interpreter, false), "()");
    }
}
