use std::env;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use tracing_subscriber::EnvFilter;

use pyinterp::lexer;
use pyinterp::{Interpreter, InterpreterConfig, Value};

const LOOP_LIMIT_VAR: &str = "PYINTERP_MAX_LOOP_ITERATIONS";
const DEPTH_LIMIT_VAR: &str = "PYINTERP_MAX_RECURSION_DEPTH";

struct Options {
    print_tokens: bool,
    config: InterpreterConfig,
    input_path: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let options = parse_args(env::args().skip(1))?;

    let source = if let Some(path) = &options.input_path {
        fs::read_to_string(path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    if options.print_tokens {
        print!("{}", lexer::format_tokens(&lexer::tokenize(&source)));
        return Ok(());
    }

    let mut interpreter = Interpreter::new(options.config);
    match interpreter.evaluate(&source)? {
        Value::None => {}
        value => println!("Result: {value}"),
    }
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut config = InterpreterConfig::default();
    if let Some(limit) = env_limit(LOOP_LIMIT_VAR)? {
        config = config.with_max_loop_iterations(limit);
    }
    if let Some(limit) = env_limit(DEPTH_LIMIT_VAR)? {
        config = config.with_max_recursion_depth(limit);
    }

    let mut print_tokens = false;
    let mut input_path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--tokens" => print_tokens = true,
            "--max-loop-iterations" => {
                config = config.with_max_loop_iterations(flag_limit(&arg, args.next())?);
            }
            "--max-recursion-depth" => {
                config = config.with_max_recursion_depth(flag_limit(&arg, args.next())?);
            }
            flag if flag.starts_with("--") => bail!("Unknown option {flag}"),
            _ => {
                if input_path.replace(arg).is_some() {
                    bail!("Only one input file is supported");
                }
            }
        }
    }

    Ok(Options {
        print_tokens,
        config,
        input_path,
    })
}

fn flag_limit(flag: &str, value: Option<String>) -> Result<usize> {
    let value = value.ok_or_else(|| anyhow!("Missing value after {flag}"))?;
    value
        .parse()
        .with_context(|| format!("Invalid value '{value}' for {flag}"))
}

fn env_limit(name: &str) -> Result<Option<usize>> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid value '{value}' in {name}")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(error) => Err(error).with_context(|| format!("Reading {name}")),
    }
}
