//! mdlax CLI - LaTeX-flavored markup to Markdown with math, and back

#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};
#[cfg(feature = "cli")]
use mdlax::{
    format_diagnostics, transform, ConversionError, Diagnostic, DiagnosticLevel, Direction,
    PipelineConfig, ReferenceMode,
};
#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read, Write};
#[cfg(feature = "cli")]
use std::path::Path;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "l2m")]
#[command(version)]
#[command(about = "mdlax - LaTeX ↔ Markdown-with-math converter", long_about = None)]
struct Cli {
    /// Input file path (reads from stdin if not provided)
    input_file: Option<String>,

    /// Output file path (writes to stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,

    /// Convert Markdown with math back to LaTeX
    #[arg(short, long)]
    reverse: bool,

    /// Load options from a JSON or TOML file; flags below override it
    #[arg(short, long)]
    config: Option<String>,

    /// Do not collect or expand macros
    #[arg(long)]
    no_macros: bool,

    /// Do not convert environments
    #[arg(long)]
    no_environments: bool,

    /// How \ref-family commands are handled
    #[arg(long, value_enum)]
    references: Option<RefMode>,

    /// Keep \label commands in the output
    #[arg(long)]
    keep_labels: bool,

    /// Strip \big-family sizing and \displaystyle inside math
    #[arg(long)]
    strip_sizing: bool,

    /// Additional environment to convert as a generic math block (repeatable)
    #[arg(long = "extra-env", value_name = "NAME")]
    extra_env: Vec<String>,

    /// Check mode - print diagnostics without writing output
    #[arg(long)]
    check: bool,

    /// Strict mode: exit with error if any warning or error is reported
    #[arg(long)]
    strict: bool,

    /// Quiet mode: suppress diagnostic output to stderr
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored diagnostics
    #[arg(long)]
    no_color: bool,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum RefMode {
    /// Leave references untouched
    Ignore,
    /// Replace references with a placeholder naming the label
    Placeholder,
    /// Number labels and substitute the numbers
    Resolve,
}

#[cfg(feature = "cli")]
impl From<RefMode> for ReferenceMode {
    fn from(mode: RefMode) -> Self {
        match mode {
            RefMode::Ignore => ReferenceMode::Ignore,
            RefMode::Placeholder => ReferenceMode::Placeholder,
            RefMode::Resolve => ReferenceMode::Resolve,
        }
    }
}

/// Read a configuration file, picking the format from the extension
#[cfg(feature = "cli")]
fn load_config(path: &str) -> Result<PipelineConfig, ConversionError> {
    let source = fs::read_to_string(path)?;
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    let config: PipelineConfig = match extension {
        "toml" => {
            toml::from_str(&source).map_err(|e| ConversionError::InvalidConfig(e.to_string()))?
        }
        "json" => serde_json::from_str(&source)
            .map_err(|e| ConversionError::InvalidConfig(e.to_string()))?,
        other => {
            return Err(ConversionError::InvalidConfig(format!(
                "unsupported config format '{}', expected .json or .toml",
                other
            )))
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "cli")]
fn build_config(cli: &Cli) -> Result<PipelineConfig, ConversionError> {
    let mut config = match cli.config {
        Some(ref path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    if cli.no_macros {
        config.expand_macros = false;
    }
    if cli.no_environments {
        config.convert_environments = false;
    }
    if let Some(mode) = cli.references {
        config.reference_mode = mode.into();
    }
    if cli.keep_labels {
        config.remove_labels = false;
        config.tag_equations = false;
    }
    if cli.strip_sizing {
        config.strip_sizing_commands = true;
    }
    config.extra_environments.extend(cli.extra_env.iter().cloned());
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "cli")]
fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let use_color = !cli.no_color;

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    // Read input
    let input = match cli.input_file {
        Some(ref path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let direction = if cli.reverse {
        Direction::Reverse
    } else {
        Direction::Forward
    };
    let (result, diagnostics) = transform(&input, &config, direction).into_parts();

    // If check mode, report and exit
    if cli.check {
        if diagnostics.is_empty() {
            println!("No issues found.");
        } else {
            println!("{}", format_diagnostics(&diagnostics, Some(&input), use_color));
        }
        if diagnostics.iter().any(|d| d.level == DiagnosticLevel::Error) {
            std::process::exit(1);
        }
        return Ok(());
    }

    // Print diagnostics to stderr (unless quiet mode)
    if !cli.quiet && !diagnostics.is_empty() {
        print_diagnostics_to_stderr(&diagnostics, &input, use_color);
    }

    // Check strict mode
    let problems = diagnostics
        .iter()
        .filter(|d| d.level != DiagnosticLevel::Info)
        .count();
    if cli.strict && problems > 0 {
        eprintln!("Error: {} warning(s) or error(s) in strict mode", problems);
        std::process::exit(1);
    }

    // Output
    match cli.output {
        Some(path) => {
            let mut file = fs::File::create(&path)?;
            writeln!(file, "{}", result)?;
            if diagnostics.is_empty() {
                eprintln!("✓ Output written to: {}", path);
            } else {
                eprintln!(
                    "⚠ Output written to: {} ({} diagnostic(s))",
                    path,
                    diagnostics.len()
                );
            }
        }
        None => {
            println!("{}", result);
        }
    }

    Ok(())
}

/// Print diagnostics to stderr with a header line
#[cfg(feature = "cli")]
fn print_diagnostics_to_stderr(diagnostics: &[Diagnostic], source: &str, use_color: bool) {
    eprintln!();
    eprintln!(
        "{}Conversion Diagnostics ({}):{}",
        if use_color { "\x1b[33m" } else { "" },
        diagnostics.len(),
        if use_color { "\x1b[0m" } else { "" }
    );
    eprintln!();
    eprint!("{}", format_diagnostics(diagnostics, Some(source), use_color));
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  cargo install mdlax --features cli");
    eprintln!("  l2m [OPTIONS] [INPUT_FILE]");
}
