//! Command-line interface definitions for mdtangle

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI structure for the mdtangle application
#[derive(Parser)]
#[command(name = "mdtangle")]
#[command(version)]
#[command(about = "Literate Markdown extraction tool", long_about = None)]
pub struct Cli {
    /// Increase verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for mdtangle
#[derive(Subcommand)]
pub enum Commands {
    /// Extract a Markdown document to a directory
    Extract {
        /// Markdown file to extract
        input: PathBuf,

        /// Preferred engine(s); the first one compiled in is used
        #[arg(short = 'b', long = "engine", value_name = "NAME", value_delimiter = ',')]
        engines: Vec<String>,

        /// Preferred syntax highlighter(s)
        #[arg(
            short = 's',
            long = "highlighter",
            value_name = "NAME",
            value_delimiter = ','
        )]
        highlighters: Vec<String>,

        /// Save the internal document state to "mdtangle.json"
        #[arg(short = 'l', long)]
        dump_state: bool,

        /// Render an error notice instead of aborting on pipeline failures
        #[arg(long)]
        lenient: bool,

        /// Deepest heading level listed in the table of contents
        #[arg(long, value_name = "N")]
        max_level: Option<u32>,
    },

    /// Create a Markdown document from the files in a directory
    Pack {
        /// Directory to pack
        input: PathBuf,
    },

    /// Show engine selection
    Engines {
        /// Preferred engine(s) to test
        #[arg(short = 'b', long = "engine", value_name = "NAME", value_delimiter = ',')]
        engines: Vec<String>,
    },

    /// Show syntax highlighter selection
    Highlighters {
        /// Preferred syntax highlighter(s) to test
        #[arg(
            short = 's',
            long = "highlighter",
            value_name = "NAME",
            value_delimiter = ','
        )]
        highlighters: Vec<String>,
    },
}
