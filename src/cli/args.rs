//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--trace <file>`: Write the walk trace to a file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bam - Dependency walker and packer for scene files
#[derive(Parser, Debug)]
#[command(name = "bam")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if bam was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    /// Write an indented trace of every visited file to this path
    #[arg(long, global = true, value_name = "FILE")]
    pub trace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Set up a project directory
    #[command(
        name = "init",
        long_about = "Set up a project directory.\n\n\
            Writes .bam/config.toml with the server URL. Commands run anywhere \
            below the directory pick up its settings."
    )]
    Init {
        /// Server URL of the project
        url: String,

        /// Project directory (default: current directory)
        dir: Option<PathBuf>,

        /// User name recorded in the project config
        #[arg(long)]
        user: Option<String>,
    },

    /// List the files a scene depends on
    #[command(
        name = "deps",
        long_about = "List the files a scene depends on.\n\n\
            Prints one line per path reference: the referencing file, the \
            stored path and whether the target exists. With --recursive, \
            linked libraries are followed and their references listed too.",
        after_help = "\
EXAMPLES:
    # Direct references of one file
    bam deps shot.blend

    # Everything reachable through library links, as JSON
    bam deps --recursive --json shot.blend"
    )]
    Deps {
        /// Scene files to inspect
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Follow library links
        #[arg(short, long)]
        recursive: bool,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy a scene and everything it depends on
    #[command(
        name = "pack",
        long_about = "Copy a scene and everything it depends on.\n\n\
            The root file is written to DST. Libraries and assets go to a \
            subdirectory next to it and every stored path is rewritten to \
            point at the copies. The source files are never modified.\n\n\
            With --archive, DST is a zip archive holding the same tree.",
        after_help = "\
EXAMPLES:
    # Flat directory next to the packed root
    bam pack shots/010.blend /tmp/out/010.blend

    # Single archive with remap manifests
    bam pack --archive --manifests shots/010.blend /tmp/010.zip"
    )]
    Pack {
        /// Root scene file
        src: PathBuf,

        /// Destination root file, or archive with --archive
        dst: PathBuf,

        /// Write a zip archive instead of a directory
        #[arg(long)]
        archive: bool,

        /// Subdirectory for libraries and assets (default: data)
        #[arg(long, value_name = "NAME")]
        subdir: Option<String>,

        /// Write .bam_deps_remap.json and .bam_paths_remap.json
        #[arg(long)]
        manifests: bool,
    },

    /// Rewrite the paths stored in one scene file
    #[command(
        name = "remap",
        long_about = "Rewrite the paths stored in one scene file.\n\n\
            MAPPING is a JSON object from current stored path to new stored \
            path. The result is written to a copy; FILE is left untouched."
    )]
    Remap {
        /// Scene file to remap
        file: PathBuf,

        /// JSON object of stored path -> replacement
        mapping: PathBuf,

        /// Output file (default: FILE with `_remap` added to its stem)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Unpack a checkout stream into a new session directory
    #[command(
        name = "unpack",
        long_about = "Unpack a checkout stream into a new session directory.\n\n\
            Reads a checkout response (from a file, or stdin when STREAM is -), \
            prints its status messages and extracts the payload. The directory \
            is then recorded as a session so later changes can be committed."
    )]
    Unpack {
        /// Checkout stream, or - for stdin
        stream: PathBuf,

        /// Session directory to create
        dir: PathBuf,
    },

    /// Show changes in a session
    #[command(name = "status")]
    Status {
        /// Session directory (default: current directory)
        dir: Option<PathBuf>,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Stage the changes of a session as a commit archive
    #[command(
        name = "commit",
        long_about = "Stage the changes of a session as a commit archive.\n\n\
            Modified and new files are collected in .bam_commit.zip inside the \
            session, with paths rewritten by pack restored to their originals."
    )]
    Commit {
        /// Session directory (default: current directory)
        dir: Option<PathBuf>,

        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
INSTALLATION:
    # Bash
    bam completion bash > ~/.local/share/bash-completion/completions/bam

    # Zsh
    bam completion zsh > ~/.zfunc/_bam

    # Fish
    bam completion fish > ~/.config/fish/completions/bam.fish

    # PowerShell
    bam completion powershell >> $PROFILE"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
