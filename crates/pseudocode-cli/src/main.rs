//! Pseudocode CLI
//!
//! Command-line interface for the pseudocode interpreter.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{NamedSource, Report};
use pseudocode_core::config::{Config, CONFIG_FILE_NAME};
use pseudocode_core::diagnostics::{DiagnosticSeverity, DiagnosticsOutput};
use pseudocode_core::doc::BuiltinCatalog;
use pseudocode_core::host::DirectoryFileStore;
use pseudocode_core::parser::parse_source;
use pseudocode_core::{InputSource, Interpreter, OutputKind, QueueInput, RunOptions};

#[derive(Parser)]
#[command(name = "pseudocode")]
#[command(author, version, about = "Run programs written in teaching pseudocode", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pseudocode program
    Run {
        /// Path to the program
        file: String,

        /// Value supplied to the next INPUT statement (repeatable). When none
        /// are given, INPUT reads from the terminal.
        #[arg(short, long = "input")]
        inputs: Vec<String>,

        /// Configuration file (defaults to pseudocode.toml next to the program)
        #[arg(short, long)]
        config: Option<String>,

        /// Directory OPENFILE works in (defaults to the program's directory)
        #[arg(long)]
        files_dir: Option<String>,

        /// Seed for RANDOM
        #[arg(long)]
        seed: Option<u64>,

        /// Output format (human, json)
        #[arg(short, long, default_value = "human")]
        format: String,

        /// Verbose mode - trace calls, loops and file operations
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check a program for syntax errors without running it
    Check {
        /// Path to the program
        file: String,

        /// Output format (human, json)
        #[arg(short, long, default_value = "human")]
        format: String,
    },

    /// Parse a program and print the AST (for debugging)
    Parse {
        /// Path to the program
        file: String,
    },

    /// Describe the built-in functions
    Builtins {
        /// Output format (markdown, json)
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },

    /// Create a starter program and configuration
    Init {
        /// Program name (used to name the .pseudo file)
        name: String,

        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        directory: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            inputs,
            config,
            files_dir,
            seed,
            format,
            verbose,
        } => cmd_run(
            &file,
            inputs,
            config.as_deref(),
            files_dir.as_deref(),
            seed,
            &format,
            verbose,
        ),
        Commands::Check { file, format } => cmd_check(&file, &format),
        Commands::Parse { file } => cmd_parse(&file),
        Commands::Builtins { format } => cmd_builtins(&format),
        Commands::Init { name, directory } => cmd_init(&name, directory.as_deref()),
    }
}

fn read_source(file: &str) -> Option<String> {
    match fs::read_to_string(file) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("{} Failed to read file '{}': {}", "error:".red().bold(), file, e);
            None
        }
    }
}

/// Directory holding `file`, or "." for a bare file name.
fn program_dir(file: &str) -> PathBuf {
    Path::new(file)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Reads INPUT values from the terminal, one line each.
struct StdinInput;

impl InputSource for StdinInput {
    fn next_input(&mut self, prompt: &str) -> Option<String> {
        print!("{} ", format!("{}?", prompt).cyan());
        io::stdout().flush().ok()?;

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

fn cmd_run(
    file: &str,
    inputs: Vec<String>,
    config_path: Option<&str>,
    files_dir: Option<&str>,
    seed: Option<u64>,
    format: &str,
    verbose: bool,
) -> ExitCode {
    let Some(source) = read_source(file) else {
        return ExitCode::from(2);
    };

    let dir = program_dir(file);
    let config = match config_path {
        Some(path) => Config::load(Path::new(path)),
        None => Config::discover(&dir),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::from(2);
        }
    };

    let files_root = files_dir
        .map(PathBuf::from)
        .or_else(|| config.files.directory.clone())
        .unwrap_or(dir);

    if verbose {
        eprintln!("[verbose] Program: {}", file);
        eprintln!("[verbose] File directory: {}", files_root.display());
        eprintln!(
            "[verbose] Limits: {} statements, {} loop iterations, call depth {}",
            config.limits.max_statements,
            config.limits.max_loop_iterations,
            config.limits.max_call_depth
        );
    }

    let json = format == "json";
    let sink = move |text: &str, kind: OutputKind| match kind {
        OutputKind::Trace => eprintln!("[verbose] {}", text),
        _ if json => {}
        OutputKind::Output => println!("{}", text),
        OutputKind::Error => eprintln!("{}", text.red()),
    };

    let mut interpreter = Interpreter::new()
        .with_config(&config)
        .with_file_store(DirectoryFileStore::new(files_root))
        .with_output(sink)
        .with_options(RunOptions { verbose });
    interpreter = if inputs.is_empty() {
        interpreter.with_input(StdinInput)
    } else {
        interpreter.with_input(QueueInput::new(inputs))
    };
    if let Some(seed) = seed {
        interpreter = interpreter.with_seed(seed);
    }

    let output = interpreter.run_source(&source);

    if json {
        let json_output = serde_json::json!({
            "version": "1.0",
            "status": if output.has_errors() { "error" } else { "ok" },
            "halted": output.halted,
            "lines": output.lines,
            "diagnostics": DiagnosticsOutput::from_diagnostics(&output.diagnostics),
        });
        match serde_json::to_string_pretty(&json_output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return ExitCode::from(2);
            }
        }
    } else if output.halted {
        eprintln!("{} `{}` was stopped by a limit", "Halted".red().bold(), file);
    }

    if output.has_errors() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn cmd_check(file: &str, format: &str) -> ExitCode {
    let Some(source) = read_source(file) else {
        return ExitCode::from(2);
    };

    let (_, diagnostics) = parse_source(&source);

    match format {
        "json" => {
            let output = DiagnosticsOutput::from_diagnostics(&diagnostics);
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("{} {}", "error:".red().bold(), e);
                    return ExitCode::from(2);
                }
            }
        }
        _ => {
            for diag in diagnostics.iter() {
                match (diag.severity, diag.to_error()) {
                    (DiagnosticSeverity::Error, Some(error)) => {
                        let report = Report::new(error)
                            .with_source_code(NamedSource::new(file, source.clone()));
                        eprintln!("{:?}", report);
                    }
                    _ => {
                        let severity_str = match diag.severity {
                            DiagnosticSeverity::Error => "error".red().bold(),
                            DiagnosticSeverity::Warning => "warning".yellow().bold(),
                        };
                        println!(
                            "{}{} {} {}",
                            severity_str,
                            format!("[{}]", diag.code).dimmed(),
                            ":".bold(),
                            diag.message
                        );
                        println!(
                            "  {} {}:{}:{}",
                            "-->".blue().bold(),
                            file,
                            diag.span.start.line,
                            diag.span.start.column
                        );
                        if let Some(ref help) = diag.help {
                            println!("   {} {}: {}", "=".blue().bold(), "help".bold(), help);
                        }
                        println!();
                    }
                }
            }

            let error_count = diagnostics.errors().count();
            let warning_count = diagnostics.warnings().count();
            if error_count > 0 {
                eprintln!(
                    "{}: could not check `{}` due to {} previous error{}{}",
                    "error".red().bold(),
                    file,
                    error_count,
                    if error_count == 1 { "" } else { "s" },
                    if warning_count > 0 {
                        format!("; {} warning{} emitted", warning_count, if warning_count == 1 { "" } else { "s" })
                    } else {
                        String::new()
                    }
                );
            } else if warning_count > 0 {
                println!(
                    "{} `{}` checked with {} warning{}",
                    "Finished".green().bold(),
                    file,
                    warning_count,
                    if warning_count == 1 { "" } else { "s" }
                );
            } else {
                println!("{} `{}` checked successfully", "Finished".green().bold(), file);
            }
        }
    }

    if diagnostics.has_errors() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn cmd_parse(file: &str) -> ExitCode {
    let Some(source) = read_source(file) else {
        return ExitCode::from(2);
    };

    let (program, diagnostics) = parse_source(&source);

    for diag in diagnostics.errors() {
        eprintln!(
            "{}: {} (line {})",
            "error".red().bold(),
            diag.message,
            diag.span.start.line
        );
    }

    match serde_json::to_string_pretty(&program) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::from(2);
        }
    }

    if diagnostics.has_errors() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn cmd_builtins(format: &str) -> ExitCode {
    let catalog = BuiltinCatalog::new();

    let output_content = match format {
        "json" => match catalog.to_json() {
            Ok(json) => json,
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return ExitCode::from(2);
            }
        },
        _ => catalog.to_markdown(),
    };

    println!("{}", output_content);
    ExitCode::SUCCESS
}

fn cmd_init(name: &str, directory: Option<&str>) -> ExitCode {
    let target_dir = Path::new(directory.unwrap_or("."));

    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        eprintln!("{} Program name must contain only alphanumeric characters and underscores", "error:".red().bold());
        return ExitCode::from(2);
    }

    if let Err(e) = fs::create_dir_all(target_dir) {
        eprintln!("{} Failed to create directory '{}': {}", "error:".red().bold(), target_dir.display(), e);
        return ExitCode::from(2);
    }

    let program_file = target_dir.join(format!("{}.pseudo", name));
    let config_file = target_dir.join(CONFIG_FILE_NAME);

    if program_file.exists() {
        eprintln!("{} File '{}' already exists", "error:".red().bold(), program_file.display());
        return ExitCode::from(2);
    }

    let program_content = format!(
        r#"// {name}
//
// Run with: pseudocode run {name}.pseudo

DECLARE Name : STRING
DECLARE Count : INTEGER

OUTPUT "What is your name?"
INPUT Name

FOR Count ← 1 TO 3
    OUTPUT "Hello, " + Name + " (" + Count + ")"
NEXT Count
"#
    );

    if let Err(e) = fs::write(&program_file, program_content) {
        eprintln!("{} Failed to write '{}': {}", "error:".red().bold(), program_file.display(), e);
        return ExitCode::from(2);
    }
    println!("{} {}", "Created".green().bold(), program_file.display());

    if config_file.exists() {
        println!("{} {} (already exists)", "Skipped".yellow().bold(), config_file.display());
    } else if let Err(e) = fs::write(&config_file, Config::template()) {
        eprintln!("{} Failed to write '{}': {}", "error:".red().bold(), config_file.display(), e);
        return ExitCode::from(2);
    } else {
        println!("{} {}", "Created".green().bold(), config_file.display());
    }

    ExitCode::SUCCESS
}
