use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use edible::{Error, Value, evaluate_str, parse_str, tokenize};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// edible evaluates a configuration document: tables, arrays, arithmetic and
/// references with table inheritance.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The document to read. `-` reads standard input.
    #[arg(default_value = "-")]
    file: String,

    /// Which stage of the pipeline to print.
    #[arg(long, value_enum, default_value_t = Emit::Value)]
    emit: Emit,

    /// How to print the evaluated value.
    #[arg(long, value_enum, default_value_t = Format::Edible)]
    format: Format,

    /// Log more; repeat for trace output. RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    Value,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Edible,
    Json,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_source(file: &str) -> io::Result<String> {
    if file == "-" {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        Ok(input)
    } else {
        fs::read_to_string(file)
    }
}

// NaN and the infinities have no JSON form and come out as `null`.
fn render_value(value: &Value, format: Format) -> Result<String, serde_json::Error> {
    match format {
        Format::Edible => Ok(value.to_string()),
        Format::Json => serde_json::to_string_pretty(value),
    }
}

enum Failure {
    Document(Vec<Error>),
    Render(serde_json::Error),
}

impl From<Vec<Error>> for Failure {
    fn from(errors: Vec<Error>) -> Self {
        Failure::Document(errors)
    }
}

fn run(args: &Args, input: &str) -> Result<String, Failure> {
    match args.emit {
        Emit::Tokens => {
            let tokens = tokenize(input)
                .map_err(|errors| errors.into_iter().map(Error::from).collect::<Vec<_>>())?;
            Ok(tokens
                .iter()
                .map(|token| format!("{:<10} {}", token.span.to_string(), token.kind))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Emit::Ast => {
            let document = parse_str(input)
                .map_err(|errors| errors.into_iter().map(Error::from).collect::<Vec<_>>())?;
            Ok(document.to_string())
        }
        Emit::Value => {
            let value = evaluate_str(input)?;
            render_value(&value, args.format).map_err(Failure::Render)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let name = if args.file == "-" { "<stdin>" } else { args.file.as_str() };
    let input = match read_source(&args.file) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", name, e);
            return ExitCode::FAILURE;
        }
    };
    debug!(file = name, bytes = input.len(), "read source");

    match run(&args, &input) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(Failure::Document(errors)) => {
            for error in &errors {
                if error.pretty_print(name, &input).is_err() {
                    eprintln!("{}", error);
                }
            }
            ExitCode::FAILURE
        }
        Err(Failure::Render(e)) => {
            eprintln!("Failed to render '{}' as {:?}: {}", name, args.format, e);
            ExitCode::FAILURE
        }
    }
}
