use reqproc_lang::lexer::tokenize;
use reqproc_lang::repl::repl;
use reqproc_lang::{Interpreter, ReqError, Result, VERSION};

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

#[derive(Parser)]
#[command(name = "reqproc", about = "ReqProc stack language interpreter")]
struct Args {
    /// Script to run
    file: Option<PathBuf>,

    /// Print the tokens of the script before running it
    #[arg(short, long)]
    tokens: bool,

    /// Start an interactive session instead of running a file
    #[arg(long)]
    repl: bool,

    /// Print the runtime version
    #[arg(short, long)]
    version: bool,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn main() {
    init_tracing();

    match run(Args::parse()) {
        Ok(()) => {}
        Err(ReqError::Exit(code)) => process::exit(code),
        Err(error) => {
            eprintln!("{}", error);
            process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<()> {
    if args.version {
        println!("ReqProc interpreter, version {:.1}", VERSION);
        if args.file.is_none() && !args.repl {
            return Ok(());
        }
    }

    if args.repl {
        println!("ReqProc {:.1}, type 'quit' to leave", VERSION);
        return repl();
    }

    let path = match args.file {
        Some(path) => path,
        None => Args::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "a script file is required unless --repl or --version is given",
            )
            .exit(),
    };

    let source = fs::read_to_string(&path)?;
    let tokens = tokenize(&source)?;
    if args.tokens {
        for token in &tokens {
            println!("{}", token);
        }
    }

    tracing::info!(path = %path.display(), tokens = tokens.len(), "running script");
    Interpreter::new(None)?.execute_tokens(&tokens)?;

    Ok(())
}
