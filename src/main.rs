use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use linnet::error::GenericResult;
use linnet::expr::ExprIdGenerator;
use linnet::stmt::print_stmt;
use linnet::{Interpreter, Mode};

const EXIT_USAGE: u8 = 64;
const EXIT_NO_INPUT: u8 = 66;

/// linnet runs scripts written in a small dynamically typed language with
/// closures and lexical scoping.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Script to run. Starts the interactive prompt when omitted.
    script: Option<PathBuf>,

    /// Print the parsed syntax tree instead of running the code.
    #[arg(long)]
    dump_ast: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return if error.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                // --help and --version
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing();

    match &cli.script {
        Some(path) => run_file(path, cli.dump_ast),
        None => match run_prompt(cli.dump_ast) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("{error}");
                ExitCode::FAILURE
            }
        },
    }
}

/// Logs go to stderr so they never mix with program output. Filtered by `LINNET_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LINNET_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run_file(path: &Path, dump_ast: bool) -> ExitCode {
    tracing::debug!(path = %path.display(), "running file");
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) => {
            eprintln!("Could not read '{}': {error}", path.display());
            return ExitCode::from(EXIT_NO_INPUT);
        }
    };

    let result = if dump_ast {
        dump(&contents, &mut ExprIdGenerator::new())
    } else {
        let mut stdout = io::stdout();
        let mut interpreter = Interpreter::with_mode(&mut stdout, Mode::Script);
        linnet::execute(&contents, &mut interpreter)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::from(error.exit_code())
        }
    }
}

fn run_prompt(dump_ast: bool) -> GenericResult<()> {
    println!("linnet {} interactive prompt. Type 'exit' to leave.", env!("CARGO_PKG_VERSION"));

    let mut stdout = io::stdout();
    let mut interpreter = Interpreter::with_mode(&mut stdout, Mode::Interactive);
    let mut lines = io::stdin().lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            // end of input
            println!();
            return Ok(());
        };
        let line = line?;

        let command = line.trim();
        if command.eq_ignore_ascii_case("exit") || command.eq_ignore_ascii_case("quit") {
            return Ok(());
        }

        let result = if dump_ast {
            dump(&line, interpreter.expr_ids())
        } else {
            linnet::execute(&line, &mut interpreter)
        };
        // errors on one line never affect the next
        if let Err(error) = result {
            eprintln!("{error}");
        }
    }
}

fn dump(code: &str, ids: &mut ExprIdGenerator) -> linnet::ExecutionResult {
    for statement in linnet::parse_source(code, ids)? {
        println!("{}", print_stmt(&statement));
    }
    Ok(())
}
