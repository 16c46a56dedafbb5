//! mdtangle - literate Markdown extraction tool
//!
//! Extracts the files embedded in a single Markdown document into a
//! directory (plus a rendered HTML copy), or packs a directory back into
//! one such document.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

use mdtangle::cli::{Cli, Commands};
use mdtangle::config::{Config, CONFIG_FILE};
use mdtangle::{engine, extract, highlight, pack, pipeline};

/// Main entry point for the mdtangle CLI application
fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Extract {
            input,
            engines,
            highlighters,
            dump_state,
            lenient,
            max_level,
        } => {
            let config = build_config(engines, highlighters, dump_state, lenient, max_level)?;
            handle_extract(&input, &config)?;
        }

        Commands::Pack { input } => {
            handle_pack(&input)?;
        }

        Commands::Engines { engines } => {
            let config = build_config(engines, Vec::new(), false, false, None)?;
            handle_engines(&config);
        }

        Commands::Highlighters { highlighters } => {
            let config = build_config(Vec::new(), highlighters, false, false, None)?;
            handle_highlighters(&config);
        }
    }

    Ok(())
}

/// Map verbosity flags onto the logger.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Error
    } else {
        match verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

/// Merge defaults, the optional settings file, and CLI flags into the
/// invocation configuration.
fn build_config(
    engines: Vec<String>,
    highlighters: Vec<String>,
    dump_state: bool,
    lenient: bool,
    max_level: Option<u32>,
) -> Result<Config> {
    let mut config = Config::default();

    if let Some(file) = Config::load_file(Path::new(CONFIG_FILE))
        .with_context(|| format!("failed to load {}", CONFIG_FILE))?
    {
        config.apply_file(file);
    }

    if !engines.is_empty() {
        config.engines = engines;
    }
    if !highlighters.is_empty() {
        config.highlighters = highlighters;
    }
    if let Some(max_level) = max_level {
        config.toc.max_level = max_level;
    }
    config.dump_state = dump_state;
    config.lenient = lenient;

    Ok(config)
}

/// Handle the extract command
fn handle_extract(input: &Path, config: &Config) -> Result<()> {
    let source = match std::fs::read_to_string(input) {
        Ok(source) => source,
        Err(_) if input.is_dir() => {
            anyhow::bail!(
                "\"{}\" is a directory; did you mean `mdtangle pack`?",
                input.display()
            );
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", input.display()));
        }
    };

    let state = pipeline::extract(&source, config)
        .with_context(|| format!("failed to extract {}", input.display()))?;

    let out_dir = extract::materialize(&state, input, config.dump_state)
        .with_context(|| format!("failed to write output for {}", input.display()))?;

    println!(
        "Extracted {} files to {}",
        state.files.len(),
        out_dir.display()
    );
    Ok(())
}

/// Handle the pack command
fn handle_pack(input: &Path) -> Result<()> {
    let output =
        pack::pack(input).with_context(|| format!("failed to pack {}", input.display()))?;
    println!("Packed {} into {}", input.display(), output.display());
    Ok(())
}

/// Handle the engines command
fn handle_engines(config: &Config) {
    println!("Engines");
    println!("  Supported: {}", engine::SUPPORTED.join(", "));
    println!("  Installed: {}", engine::installed().join(", "));
    println!("  Preferred: {}", config.engines.join(", "));
    match config.select_engine() {
        Ok(selected) => println!("  Selected:  {}", selected.name()),
        Err(e) => println!("  Selected:  none ({})", e),
    }
}

/// Handle the highlighters command
fn handle_highlighters(config: &Config) {
    println!("Syntax highlighters");
    println!("  Supported: {}", highlight::SUPPORTED.join(", "));
    println!("  Preferred: {}", config.highlighters.join(", "));
    match config.select_highlighter() {
        Ok(selected) => println!("  Selected:  {}", selected.name()),
        Err(e) => println!("  Selected:  none ({})", e),
    }
}
