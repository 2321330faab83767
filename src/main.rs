use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use hack_assembler::assembler::{Assembler, Config};
use hack_assembler::diagnostics::banner;

const INPUT_EXTENSION: &str = ".asm";

/// Environment toggle for verbose tracing.
const DEBUG_ENV: &str = "DBG";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Parser, Debug)]
#[command(name = "hackasm")]
#[command(version, about = "Hack assembler: translates .asm into .hack", long_about = None)]
struct Cli {
    /// Hack assembly source file
    #[arg(value_name = "FILE", value_parser = asm_source)]
    input: PathBuf,

    /// Trace every pipeline step (also enabled by DBG=y)
    #[arg(short, long)]
    verbose: bool,

    /// When to color diagnostics
    #[arg(long, value_enum, default_value = "auto")]
    color: ColorMode,
}

fn asm_source(arg: &str) -> Result<PathBuf, String> {
    if arg.len() > INPUT_EXTENSION.len() && arg.ends_with(INPUT_EXTENSION) {
        Ok(PathBuf::from(arg))
    } else {
        Err(format!("expected a file ending in {INPUT_EXTENSION}"))
    }
}

fn debug_from_env() -> bool {
    match std::env::var(DEBUG_ENV) {
        Ok(value) => !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "" | "n" | "no" | "false" | "off" | "0"
        ),
        Err(_) => false,
    }
}

fn init_tracing(config: &Config) {
    let filter = if config.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(config.color)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = Config {
        verbose: cli.verbose || debug_from_env(),
        color: match cli.color {
            ColorMode::Auto => io::stderr().is_terminal(),
            ColorMode::Always => true,
            ColorMode::Never => false,
        },
    };
    colored::control::set_override(config.color);
    init_tracing(&config);
    tracing::debug!("debug mode is on");

    let assembler = Assembler::new(config);
    match assembler.assemble_file(&cli.input) {
        Ok(output) => {
            let message = format!(
                "Assembly of {} successful! check {}",
                cli.input.display(),
                output.display()
            );
            eprintln!("\n{}", banner(true, &message, config.color));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("\n{}", banner(false, &err.to_string(), config.color));
            ExitCode::FAILURE
        }
    }
}
