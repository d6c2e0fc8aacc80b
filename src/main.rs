use clap::{Parser as ClapParser, Subcommand};
use qconsole::cli::{self, CliError, SessionOptions};
use std::{
    io::{self, Read},
    path::PathBuf,
};

#[derive(ClapParser)]
#[command(name = "qconsole")]
#[command(about = "qconsole - An interpreter for a small q-like language of lists and tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Answer table literals and queries with canned fingerprint tables
    #[arg(long, global = true)]
    legacy: bool,

    /// Echo statements that do not parse instead of reporting an error
    #[arg(long, global = true)]
    lenient: bool,

    /// Print inline HTML instead of plain text
    #[arg(long, global = true)]
    markup: bool,

    /// Do not bind the sample `trade` table
    #[arg(long, global = true)]
    no_sample: bool,

    /// One statement per line, without joining lines inside open brackets
    #[arg(long, global = true)]
    per_line: bool,

    /// JSON file of extra bindings, tables as {"columns": [...], "rows": [[...]]}
    #[arg(long, global = true, value_name = "FILE")]
    seed: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script
    Run {
        /// Script file (reads from stdin if not provided)
        file: Option<PathBuf>,
    },

    /// Interactive session, one statement per line
    Repl,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let options = SessionOptions {
        legacy: cli.legacy,
        lenient: cli.lenient,
        no_sample: cli.no_sample,
        per_line: cli.per_line,
        seed: cli.seed,
    };

    let result = match cli.command {
        Commands::Run { file } => run_script(&options, file, cli.markup),
        Commands::Repl => run_repl(&options, cli.markup),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr, and only when RUST_LOG is set.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_script(options: &SessionOptions, file: Option<PathBuf>, markup: bool) -> Result<(), CliError> {
    let source = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        None => return Err(CliError::NoInput),
    };

    let mut interpreter = cli::build_interpreter(options)?;
    for line in cli::execute_script(&mut interpreter, &source, markup) {
        println!("{}", line);
    }
    Ok(())
}

fn run_repl(options: &SessionOptions, markup: bool) -> Result<(), CliError> {
    let mut interpreter = cli::build_interpreter(options)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    cli::repl(&mut interpreter, stdin.lock(), &mut stdout, markup)
}
