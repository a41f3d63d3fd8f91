//! Quasar command-line driver.
//!
//! Three verbs: `compile` writes the emitted Python, `run` compiles and
//! invokes the host `python3` interpreter, `check` reports diagnostics.
//! Exit codes: 0 success, 1 compilation error, 2 runtime error during
//! `run`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quasar::Diagnostic;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "quasar")]
#[command(version)]
#[command(about = "Quasar to Python source-to-source compiler")]
#[command(long_about = r#"
Quasar compiles .qsr programs (statically typed, C-family syntax) to
Python 3.10+ source text.

Example usage:
  quasar compile program.qsr -o program.py
  quasar run program.qsr
  quasar check program.qsr
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .qsr file to Python source
    Compile {
        /// Input .qsr file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile a .qsr file and run it with python3
    Run {
        /// Input .qsr file
        input: PathBuf,
    },

    /// Run the pipeline and report success or diagnostics
    Check {
        /// Input .qsr file
        input: PathBuf,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { input, output } => cmd_compile(input, output),
        Commands::Run { input } => cmd_run(input),
        Commands::Check { input, json } => cmd_check(input, json),
    }
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic);
    }
}

fn cmd_compile(input: PathBuf, output: Option<PathBuf>) -> ExitCode {
    match quasar::compile(&input) {
        Ok(code) => {
            if let Some(out_path) = output {
                if let Err(err) = fs::write(&out_path, &code) {
                    eprintln!("error: failed to write {}: {}", out_path.display(), err);
                    return ExitCode::from(1);
                }
                eprintln!("Wrote {} bytes to {}", code.len(), out_path.display());
            } else {
                print!("{}", code);
            }
            ExitCode::SUCCESS
        }
        Err(diagnostics) => {
            report(&diagnostics);
            ExitCode::from(1)
        }
    }
}

fn cmd_run(input: PathBuf) -> ExitCode {
    let code = match quasar::compile(&input) {
        Ok(code) => code,
        Err(diagnostics) => {
            report(&diagnostics);
            return ExitCode::from(1);
        }
    };

    match run_python(&input, &code) {
        Ok(status) if status => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

/// Write the emitted program to a temp file and hand it to python3,
/// propagating whether the interpreter exited cleanly.
fn run_python(input: &std::path::Path, code: &str) -> Result<bool> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("program");
    let py_file = std::env::temp_dir().join(format!("quasar_{}_{}.py", stem, std::process::id()));

    fs::write(&py_file, code)
        .with_context(|| format!("failed to write {}", py_file.display()))?;

    let status = std::process::Command::new("python3")
        .arg(&py_file)
        .status()
        .context("could not run python3")?;

    let _ = fs::remove_file(&py_file);
    Ok(status.success())
}

fn cmd_check(input: PathBuf, json: bool) -> ExitCode {
    match quasar::compile(&input) {
        Ok(_) => {
            if json {
                println!("{{\"ok\": true, \"diagnostics\": []}}");
            } else {
                println!("{}: ok", input.display());
            }
            ExitCode::SUCCESS
        }
        Err(diagnostics) => {
            if json {
                println!("{{");
                println!("  \"ok\": false,");
                println!("  \"diagnostics\": [");
                for (i, d) in diagnostics.iter().enumerate() {
                    let comma = if i + 1 < diagnostics.len() { "," } else { "" };
                    println!(
                        "    {{\"code\": \"{}\", \"file\": \"{}\", \"line\": {}, \"column\": {}, \"message\": \"{}\"}}{}",
                        d.code,
                        json_escape(&d.file),
                        d.span.start_line,
                        d.span.start_column,
                        json_escape(&d.message),
                        comma
                    );
                }
                println!("  ]");
                println!("}}");
            } else {
                report(&diagnostics);
            }
            ExitCode::from(1)
        }
    }
}

fn json_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
