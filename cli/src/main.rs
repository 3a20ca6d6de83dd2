use std::{
    fs,
    io::{self, BufRead, Read, Write},
    path::{Path, PathBuf},
    process,
};

use clap::{ArgAction, Parser, ValueEnum};
use log::{debug, LevelFilter};
use monkeyc::{
    ast::Program, disassembler::Listing, error::CompileError, symbol_table::SymbolTable,
    value::Value, Bytecode, Compiler,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Human readable disassembly
    Listing,
    /// The bytecode artifact serialized as JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "monkeyc",
    version,
    about = "Compile a JSON encoded syntax tree to bytecode"
)]
struct Cli {
    /// Program to compile ('-' for stdin). Starts a REPL when omitted
    path: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Emit::Listing)]
    emit: Emit,

    /// Log more (-v debug, -vv trace). RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}

impl Error {
    fn exit_code(&self) -> i32 {
        match self {
            Error::Io(_) => 74,
            Error::Json(_) | Error::Compile(_) => 65,
        }
    }
}

fn repl(emit: Emit) -> io::Result<()> {
    let mut symbol_table = SymbolTable::new();
    let mut constants: Vec<Value> = vec![];
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let program = match parse(&line) {
            Ok(program) => program,
            Err(e) => {
                eprintln!("\t{e}");
                continue;
            }
        };

        // Globals defined by a line that fails to compile are forgotten
        let mut compiler = Compiler::new_with_state(symbol_table.clone(), constants.clone());
        match compiler.compile(&program) {
            Ok(()) => {
                print_bytecode(&compiler.bytecode(), emit)?;
                (symbol_table, constants) = compiler.into_state();
            }
            Err(e) => eprintln!("\t{}", Error::Compile(e)),
        }
    }
    Ok(())
}

fn run_file(path: &Path, emit: Emit) -> Result<(), Error> {
    let source = read_source(path)?;
    let program = parse(&source)?;
    debug!("parsed {} statements from {}", program.statements.len(), path.display());

    let mut compiler = Compiler::new();
    compiler.compile(&program)?;
    print_bytecode(&compiler.bytecode(), emit)?;
    Ok(())
}

fn read_source(path: &Path) -> io::Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        fs::read_to_string(path)
    }
}

fn parse(source: &str) -> Result<Program, Error> {
    Ok(serde_json::from_str(source)?)
}

fn print_bytecode(bytecode: &Bytecode, emit: Emit) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    match emit {
        Emit::Listing => write!(stdout, "{}", Listing(bytecode))?,
        Emit::Json => {
            serde_json::to_writer_pretty(&mut stdout, bytecode)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(level_filter(cli.verbose))
        .parse_default_env()
        .init();

    match cli.path {
        None => {
            if let Err(e) = repl(cli.emit) {
                eprintln!("{}", Error::Io(e));
                process::exit(74);
            }
        }
        Some(path) => {
            if let Err(e) = run_file(&path, cli.emit) {
                eprintln!("{}: {e}", path.display());
                process::exit(e.exit_code());
            }
        }
    }
}
