//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Ask questions about a PDF or text document with Gemini
#[derive(Parser, Debug)]
#[command(name = "doc-qa", about, version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DocumentArgs {
    /// PDF, TXT (or MD with --markdown) file to load
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Text to use as the document; takes precedence over --file
    #[arg(short, long)]
    pub text: Option<String>,

    /// Also accept .md uploads
    #[arg(long)]
    pub markdown: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask one question about a document
    Ask {
        #[command(flatten)]
        document: DocumentArgs,
        /// The question to ask
        #[arg(short, long)]
        question: String,
    },
    /// Chat interactively, optionally about a document
    Chat {
        #[command(flatten)]
        document: DocumentArgs,
    },
    /// Underline べき expressions and optionally export HTML
    Highlight {
        #[command(flatten)]
        document: DocumentArgs,
        /// Where to write the highlighted HTML
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the effective settings
    Settings,
}
