use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use bfpeep::brainfuck::{compile, compile_unoptimized, dump};
use bfpeep::{Eof, Error, Machine};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bfpeep")]
#[command(about = "A peephole-optimizing brainfuck interpreter")]
struct Args {
    /// Path to the Brainfuck program file to execute
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Write the compiled instruction listing to this file
    #[arg(short, long, value_name = "PATH")]
    dump: Option<PathBuf>,

    /// Flush stdout after each . instruction
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    flush: bool,

    /// Report the elapsed run time on stderr
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    time: bool,

    /// Skip the peephole optimizer
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_optimize: bool,

    /// What , does when stdin is exhausted
    #[arg(long, value_enum, default_value_t = EofArg::Unchanged)]
    eof: EofArg,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EofArg {
    Unchanged,
    Zero,
    Fail,
}

impl From<EofArg> for Eof {
    fn from(arg: EofArg) -> Self {
        match arg {
            EofArg::Unchanged => Eof::Unchanged,
            EofArg::Zero => Eof::Zero,
            EofArg::Fail => Eof::Fail,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn execute(args: &Args) -> Result<(), Error> {
    let code = std::fs::read(&args.file).map_err(|source| Error::Read {
        path: args.file.clone(),
        source,
    })?;
    let prog = if args.no_optimize {
        compile_unoptimized(&code)?
    } else {
        compile(&code)?
    };

    if let Some(path) = &args.dump {
        let dump_err = |source| Error::Dump {
            path: path.clone(),
            source,
        };
        let mut out = BufWriter::new(File::create(path).map_err(dump_err)?);
        dump(&prog, &mut out)
            .and_then(|()| out.flush())
            .map_err(dump_err)?;
        info!(path = %path.display(), "wrote instruction listing");
    }

    let mut machine = Machine::with_eof(args.eof.into());
    let mut input = io::stdin().lock();
    let mut output = BufWriter::new(io::stdout().lock());
    let start = Instant::now();
    if args.flush {
        machine.run::<true, _, _>(&prog, &mut input, &mut output)?;
    } else {
        machine.run::<false, _, _>(&prog, &mut input, &mut output)?;
    }
    let elapsed = start.elapsed();
    if args.time {
        eprintln!("\n\nTotal Time: {} ms", elapsed.as_millis());
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    match execute(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("bfpeep: {}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
