use crate::stream::Pattern;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "framewatch-demo")]
#[command(
    author,
    version,
    about = "Continuously classify a synthetic streaming image source"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a synthetic source and print labels as they change
    Run {
        /// Model directory, descriptor, or weights file
        #[arg(short, long, env = "FRAMEWATCH_MODEL")]
        model: Option<PathBuf>,

        /// Monitor settings file (YAML)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Confidence threshold (overrides the settings file)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Source identifier
        #[arg(long, default_value = "Volume_1")]
        source: String,

        /// Frame width
        #[arg(long, default_value = "64")]
        width: usize,

        /// Frame height
        #[arg(long, default_value = "64")]
        height: usize,

        /// Scalar components per pixel
        #[arg(long, default_value = "1")]
        components: usize,

        /// Synthetic image content
        #[arg(short, long, value_enum, default_value = "blob")]
        pattern: Pattern,

        /// Frames per second
        #[arg(short, long, default_value = "10")]
        rate: f64,

        /// Duration in seconds (0 = until Ctrl+C)
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Seed for reproducible frames
        #[arg(long)]
        seed: Option<u64>,

        /// Print labels as JSON lines
        #[arg(long)]
        json: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Write a model directory with randomly initialized weights
    Scaffold {
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Model name
        #[arg(short, long, default_value = "framewatch-cnn")]
        name: String,

        /// Input edge length
        #[arg(long, default_value = "32")]
        size: usize,

        /// Input channels
        #[arg(long, default_value = "1")]
        channels: usize,

        /// Class labels (comma-separated)
        #[arg(long, value_delimiter = ',')]
        labels: Option<Vec<String>>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print a summary of a model and check that its weights load
    Inspect {
        /// Model directory, descriptor, or weights file
        model: PathBuf,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "framewatch-demo",
            "run",
            "--model",
            "./models/cars",
            "--pattern",
            "gradient",
            "-t",
            "0.7",
        ]);

        match cli.command {
            Commands::Run {
                model,
                threshold,
                pattern,
                duration,
                ..
            } => {
                assert_eq!(model, Some(PathBuf::from("./models/cars")));
                assert_eq!(threshold, Some(0.7));
                assert_eq!(pattern, Pattern::Gradient);
                assert_eq!(duration, 10);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_scaffold_labels() {
        let cli = Cli::parse_from([
            "framewatch-demo",
            "scaffold",
            "-o",
            "out",
            "--labels",
            "car,truck,none",
        ]);

        match cli.command {
            Commands::Scaffold { labels, size, .. } => {
                assert_eq!(labels.map(|l| l.len()), Some(3));
                assert_eq!(size, 32);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
