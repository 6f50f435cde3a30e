use crate::ui::{default_output, CollectionMode, ModeWizard, WalkSpinner};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use code2txt::output::{write_report, DumpHeader, DumpWriter, Report};
use code2txt::{CollectorConfig, FolderWalker, GraphWalker};
use colored::*;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "code2txt")]
#[command(version, about = "Combine related text and script files into one dump, skipping firmware and binaries", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Maximum number of files classified in main-file mode
    #[arg(long, value_name = "N", global = true)]
    pub max_files: Option<usize>,

    /// Maximum reference depth followed from the main file
    #[arg(long, value_name = "N", global = true)]
    pub max_depth: Option<usize>,

    /// Skip files larger than this many bytes
    #[arg(long, value_name = "BYTES", global = true)]
    pub max_bytes: Option<u64>,

    /// Extra directory searched for bare file names (repeatable)
    #[arg(long = "root", value_name = "DIR", global = true)]
    pub roots: Vec<PathBuf>,

    /// Reject referenced files outside the main file's directory and --root dirs
    #[arg(long, global = true)]
    pub confine: bool,

    /// Write a JSON report of accepted, rejected and unresolved files
    #[arg(long, value_name = "FILE", global = true)]
    pub report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (suppress output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Do not show the progress spinner
    #[arg(long, global = true)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Combine a main script and every file it references
    Main {
        /// Main script file
        file: PathBuf,

        /// Output file (default: <main stem>.txt)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Combine every text file under a folder
    Folder {
        /// Root folder
        dir: PathBuf,

        /// Output file (default: combined.txt)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Additional directory name to prune (repeatable)
        #[arg(long = "exclude-dir", value_name = "NAME")]
        exclude_dirs: Vec<String>,
    },
}

impl Args {
    /// `warn` by default; `RUST_LOG` overrides this in `main`.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }

    fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}

pub fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;

    match args.command.clone() {
        Some(Commands::Main { file, output }) => {
            let output = output.unwrap_or_else(|| default_output(CollectionMode::MainFile, &file));
            combine_main_file(&args, &config, &file, &output)
        }
        Some(Commands::Folder { dir, output, exclude_dirs }) => {
            config.extra_exclude_dirs.extend(exclude_dirs);
            let output = output.unwrap_or_else(|| default_output(CollectionMode::Folder, &dir));
            combine_folder(&args, &config, &dir, &output)
        }
        None => {
            let selection = ModeWizard::new().run()?;
            match selection.mode {
                CollectionMode::MainFile => combine_main_file(&args, &config, &selection.input, &selection.output),
                CollectionMode::Folder => combine_folder(&args, &config, &selection.input, &selection.output),
            }
        }
    }
}

fn load_config(args: &Args) -> Result<CollectorConfig> {
    let mut config = match &args.config {
        Some(path) => CollectorConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => CollectorConfig::default(),
    };

    if let Some(max) = args.max_files {
        config.max_referenced_files = max;
    }
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }
    if args.max_bytes.is_some() {
        config.max_file_bytes = args.max_bytes;
    }
    if args.confine {
        config.confine_to_roots = true;
    }
    config.extra_roots.extend(args.roots.iter().cloned());

    Ok(config.validate())
}

fn combine_main_file(args: &Args, config: &CollectorConfig, file: &Path, output: &Path) -> Result<()> {
    let spinner = WalkSpinner::start(format!("Following references from {}", file.display()), args.show_progress());

    let outcome = match GraphWalker::new(config).walk(file) {
        Ok(outcome) => outcome,
        Err(err) => {
            spinner.abandon();
            return Err(err).context("Main-file collection failed");
        }
    };

    spinner.set_message(format!("Writing {}", output.display()));
    let header = DumpHeader::for_main_file(&outcome, config);
    let written = DumpWriter::create(output)
        .context("Failed to create output file")?
        .write_main_dump(&outcome, &header)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    spinner.finish(format!("{written} files collected"));

    if let Some(report_path) = &args.report {
        write_report(&Report::main_file(&outcome, output), report_path).context("Failed to write report")?;
    }

    if !args.quiet {
        print_summary(written, outcome.rejected.len(), output);
        if !outcome.unresolved.is_empty() {
            println!("  {} references could not be resolved", outcome.unresolved.len().to_string().yellow());
        }
        if outcome.limits_hit {
            println!(
                "  {} reference limits reached (depth {}, {} files); output is partial",
                "!".yellow().bold(),
                config.max_depth,
                config.max_referenced_files
            );
        }
    }

    Ok(())
}

fn combine_folder(args: &Args, config: &CollectorConfig, dir: &Path, output: &Path) -> Result<()> {
    let spinner = WalkSpinner::start(format!("Scanning {}", dir.display()), args.show_progress());

    let outcome = match FolderWalker::new(config).skip_path(output).walk(dir) {
        Ok(outcome) => outcome,
        Err(err) => {
            spinner.abandon();
            return Err(err).context("Folder collection failed");
        }
    };

    spinner.set_message(format!("Writing {}", output.display()));
    let header = DumpHeader::for_folder(&outcome, config);
    let written = DumpWriter::create(output)
        .context("Failed to create output file")?
        .write_folder_dump(&outcome, &header)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    spinner.finish(format!("{written} files collected"));

    if let Some(report_path) = &args.report {
        write_report(&Report::folder(&outcome, output), report_path).context("Failed to write report")?;
    }

    if !args.quiet {
        print_summary(written, outcome.rejected.len(), output);
    }

    Ok(())
}

fn print_summary(written: usize, rejected: usize, output: &Path) {
    println!("{} Wrote {} files to {}", "✓".green(), written.to_string().bold(), output.display());
    if rejected > 0 {
        println!("  {} files skipped (excluded, firmware, binary or unreadable)", rejected.to_string().yellow());
    }
}
