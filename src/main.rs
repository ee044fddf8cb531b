use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser as ClapParser, Subcommand};

use vscript_lang::lexer::Lexer;
use vscript_lang::runtime::Interpreter;
use vscript_lang::Format;

#[derive(ClapParser)]
#[command(name = "vscript", version, about = "Visual script evaluator")]
struct Cli {
    /// Document format (detected from the file extension when omitted)
    #[arg(short, long, global = true, value_enum, env = "VSCRIPT_FORMAT")]
    format: Option<Format>,
    /// Log at debug level unless VSCRIPT_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the token stream of a text-format document (debug)
    Tokenize {
        /// Path to the document
        file: PathBuf,
    },
    /// Load a document and display the program model
    Parse {
        /// Path to the document
        file: PathBuf,
        /// Print the model as JSON instead of a debug tree
        #[arg(long)]
        json: bool,
    },
    /// Execute a document
    Run {
        /// Path to the document
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Commands::Tokenize { file } => cmd_tokenize(&file),
        Commands::Parse { file, json } => cmd_parse(&file, cli.format, json),
        Commands::Run { file } => cmd_run(&file, cli.format),
    };
    process::exit(exit_code);
}

/// Logs go to stderr so they never interleave with program output.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("VSCRIPT_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

const MAX_SOURCE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

fn read_source(path: &Path) -> Result<(String, String), i32> {
    let filename = path.to_string_lossy().to_string();

    match std::fs::metadata(path) {
        Ok(meta) => {
            if meta.len() > MAX_SOURCE_SIZE {
                eprintln!(
                    "Error: file {} is too large ({} bytes, max {} bytes)",
                    filename,
                    meta.len(),
                    MAX_SOURCE_SIZE
                );
                return Err(1);
            }
        }
        Err(e) => {
            eprintln!("Error: cannot read file {}: {}", filename, e);
            return Err(1);
        }
    }

    match std::fs::read_to_string(path) {
        Ok(source) => Ok((source, filename)),
        Err(e) => {
            eprintln!("Error: cannot read file {}: {}", filename, e);
            Err(1)
        }
    }
}

fn load(path: &Path, format: Option<Format>) -> Result<vscript_lang::ast::VisualScript, i32> {
    let (source, filename) = read_source(path)?;
    let format = format.unwrap_or_else(|| Format::detect(path));
    vscript_lang::load(&source, &filename, format).map_err(|e| {
        eprintln!("{}", e);
        1
    })
}

fn cmd_tokenize(path: &Path) -> i32 {
    let (source, filename) = match read_source(path) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let tokens = match Lexer::new(&source, &filename).tokenize() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Lexer error: {}", e);
            return 1;
        }
    };

    for token in &tokens {
        println!("{}", token);
    }
    0
}

fn cmd_parse(path: &Path, format: Option<Format>, json: bool) -> i32 {
    let program = match load(path, format) {
        Ok(p) => p,
        Err(code) => return code,
    };

    if json {
        match serde_json::to_string_pretty(&program) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: cannot render JSON: {}", e);
                return 1;
            }
        }
    } else {
        println!("{:#?}", program);
    }
    0
}

fn cmd_run(path: &Path, format: Option<Format>) -> i32 {
    let program = match load(path, format) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let mut interpreter = Interpreter::new(&program);
    match interpreter.run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            1
        }
    }
}
