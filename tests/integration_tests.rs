use qconsole::{
    DisplayLine, EngineMode, Interpreter, InterpreterConfig, Leniency, LineJoining, Style, Table,
    Value,
};

fn run(source: &str) -> Vec<String> {
    render(&Interpreter::with_sample_data(InterpreterConfig::default()).run(source))
}

fn run_with(config: InterpreterConfig, source: &str) -> Vec<String> {
    render(&Interpreter::with_sample_data(config).run(source))
}

fn render(lines: &[DisplayLine]) -> Vec<String> {
    lines.iter().map(ToString::to_string).collect()
}

#[test]
fn test_assignment_then_reference() {
    assert_eq!(
        run("x: 5\nx"),
        vec!["// Assigned to variable: x", "q) x", "5"]
    );
}

#[test]
fn test_arithmetic() {
    assert_eq!(run("2 + 3 * 4"), vec!["q) 2 + 3 * 4", "14"]);
    assert_eq!(run("0.1 + 0.2"), vec!["q) 0.1 + 0.2", "0.3"]);
    assert_eq!(run("(2 + 3) * 4"), vec!["q) (2 + 3) * 4", "20"]);
}

#[test]
fn test_division_by_zero() {
    assert_eq!(run("1 % 0")[1], "0w");
    assert_eq!(run("-1 / 0")[1], "-0w");
    assert_eq!(run("0/0")[1], "0n");
}

#[test]
fn test_vector_arithmetic_and_comparison() {
    assert_eq!(run("1 2 3 * 2")[1], "2 4 6");
    assert_eq!(run("1 2 3 > 2")[1], "0b 0b 1b");
    assert_eq!(run("1 2 + 1 2 3")[1], "Error: Length error: expected 2 items, found 3");
}

#[test]
fn test_variables_in_expressions() {
    assert_eq!(
        run("a: 10\nb: a * 2\na + b"),
        vec![
            "// Assigned to variable: a",
            "// Assigned to variable: b",
            "q) a + b",
            "30"
        ]
    );
}

#[test]
fn test_list_assignment_shows_value() {
    assert_eq!(
        run("l: 10 20 30\nl[1]"),
        vec!["// Assigned to variable: l", "10 20 30", "q) l[1]", "20"]
    );
}

#[test]
fn test_builtins() {
    assert_eq!(run("til 5")[1], "0 1 2 3 4");
    assert_eq!(run("count til 10")[1], "10");
    assert_eq!(run("sum 1 2 3 4")[1], "10");
    assert_eq!(run("avg 1 2 3 4")[1], "2.5");
    assert_eq!(run("max 3 9 4")[1], "9");
    assert_eq!(run("last `a`b`c")[1], "`c");
    assert_eq!(run("cols trade")[1], "`date`sym`price`size");
    assert_eq!(run("1 2 3 wavg 4 5 6")[1], "5.333333333333333");
}

#[test]
fn test_fuzzy_bracketed_call() {
    assert_eq!(run("myAvg[2 4]"), vec!["q) myAvg[2 4]", "3"]);
}

#[test]
fn test_unknown_bracketed_call_is_a_placeholder() {
    assert_eq!(
        run("doSomething[1]"),
        vec!["q) doSomething[1]", "\"Function executed\""]
    );
}

#[test]
fn test_function_definitions() {
    assert_eq!(
        run("square: {x*x}\nf{x}: x+1\nsquare 3"),
        vec![
            "// Function defined: square",
            "// Function defined: f",
            "q) square 3",
            "\"Function executed\""
        ]
    );
}

#[test]
fn test_multi_line_function_is_one_statement_when_joining() {
    let source = "\
calculateVWAP: {[table]
    select vwap: sum[price*size]%sum size by sym from table
};
calculateVWAP[trade]";
    let config = InterpreterConfig::default().with_joining(LineJoining::Brackets);
    let lines = run_with(config, source);
    assert_eq!(lines[0], "// Function defined: calculateVWAP");
    assert_eq!(lines[1], "q) calculateVWAP[trade]");
    assert!(lines[2].starts_with("sym  vwap"));
    assert!(lines[2].contains("AAPL 185.94"));
}

#[test]
fn test_lines_are_statements_by_default() {
    let lines = run("f: {x\n x\n}");
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("Error: Parse error"));
    assert_eq!(lines[1], "q) x");
    assert_eq!(lines[2], "Error: Undefined name: x");
    assert_eq!(lines[3], "q) }");
}

#[test]
fn test_strings_render_quoted() {
    let lines = Interpreter::new(InterpreterConfig::default()).run(r#""hello""#);
    assert_eq!(lines[1], DisplayLine::new(Style::Text, "\"hello\""));
}

#[test]
fn test_errors_do_not_stop_the_run() {
    assert_eq!(
        run("foo\n1 + 1"),
        vec!["q) foo", "Error: Undefined name: foo", "q) 1 + 1", "2"]
    );
}

#[test]
fn test_parse_error_message() {
    assert_eq!(
        run("(1 + 2")[1],
        "Error: Parse error: Unexpected end of input, expected ')'"
    );
}

#[test]
fn test_echo_leniency() {
    let config = InterpreterConfig::default().with_leniency(Leniency::Echo);
    assert_eq!(run_with(config.clone(), "foo bar"), vec!["q) foo bar", "\"foo bar\""]);
    // Arithmetic failures are still errors.
    assert_eq!(
        run_with(config, "2 + + 3")[1],
        "Error: Cannot evaluate expression: 2 + + 3"
    );
}

#[test]
fn test_comments_and_blank_lines_are_skipped() {
    assert_eq!(
        run("// setup\n\nx: 1 // inline\n   \nx"),
        vec!["// Assigned to variable: x", "q) x", "1"]
    );
}

#[test]
fn test_table_output() {
    let lines = run("select from trade where price > 200");
    assert_eq!(
        lines[1],
        "date       sym  price  size\n---------------------------\n2023.10.01 MSFT 402.15 200"
    );
}

#[test]
fn test_markup_output() {
    let mut q = Interpreter::new(InterpreterConfig::default());
    assert_eq!(
        q.run_markup("1+1\n\"a<b\""),
        vec![
            r#"<div class="text-white"><span class="text-[#0078d4]">q) </span>1+1</div>"#,
            r#"<div class="text-white">2</div>"#,
            r#"<div class="text-white"><span class="text-[#0078d4]">q) </span>&quot;a&lt;b&quot;</div>"#,
            r#"<div class="text-[#ce9178]">&quot;a&lt;b&quot;</div>"#,
        ]
    );
}

#[test]
fn test_host_seeding() {
    let mut q = Interpreter::new(InterpreterConfig::default());
    let table = Table::new(
        vec!["sym".to_string(), "bid".to_string()],
        vec![vec![Value::Symbol("IBM".to_string()), Value::Number(140.5)]],
    )
    .unwrap();
    q.symbols_mut().insert("quotes", Value::Table(table));

    let lines = render(&q.run("select max bid from quotes"));
    assert_eq!(lines[1], "max_bid\n-------\n140.5");
}

#[test]
fn test_legacy_mode() {
    let config = InterpreterConfig::default().with_mode(EngineMode::Legacy);
    let lines = run_with(config, "t: ([] a: 1 2)\nselect from nothing\ncalculateVWAP[x]");
    assert_eq!(lines[0], "// Assigned to variable: t");
    assert!(lines[1].starts_with("column1 column2"));
    assert_eq!(lines[2], "q) select from nothing");
    assert!(lines[3].starts_with("result"));
    assert!(lines[5].contains("AAPL 185.965"));
}

#[test]
fn test_interpreters_are_independent() {
    let mut a = Interpreter::new(InterpreterConfig::default());
    let mut b = Interpreter::new(InterpreterConfig::default());
    a.run("x: 1");
    assert!(a.symbols().contains("x"));
    assert_eq!(render(&b.run("x"))[1], "Error: Undefined name: x");
}
