use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "jar-shrinker")]
#[command(about = "Shrink a jar to the classes reachable from the given entry classes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding cached extractions and staging trees.
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    #[arg(short = 'v', long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,

    #[arg(short = 'q', long, global = true, action = ArgAction::SetTrue, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Extract, resolve, stage and pack the reachable classes.
    Shrink {
        #[arg(required = true, value_name = "CLASS")]
        classes: Vec<String>,

        #[arg(long, value_name = "FILE")]
        jar: PathBuf,

        #[arg(short = 'o', long, value_name = "DIR")]
        output: PathBuf,

        #[arg(long, value_name = "FILE", default_value = "final.jar")]
        name: String,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Print the reachable classes without packing.
    Closure {
        #[arg(required = true, value_name = "CLASS")]
        classes: Vec<String>,

        #[arg(long, value_name = "FILE")]
        jar: PathBuf,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Print the class references of a single class file.
    Refs { class_file: PathBuf },
    /// Remove all cached extractions.
    Clear,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
