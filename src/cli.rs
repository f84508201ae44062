use clap::{Parser, Subcommand};
use std::path::PathBuf;

use framescribe::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "framescribe",
    version,
    about = "Extract text-bearing frames and time-coded transcripts from video and audio"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process media files and directories
    Process {
        /// Media files, or directories to search for media files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Search directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Root directory for per-file output folders
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Whisper model name or path
        #[arg(long)]
        model: Option<String>,

        /// Do not extract frames
        #[arg(long)]
        no_frames: bool,

        /// Do not transcribe audio
        #[arg(long)]
        skip_transcription: bool,

        /// Skip files whose time-coded transcript already exists and is over 1 KB
        #[arg(long)]
        skip_processed: bool,
    },

    /// Print a commented default config file
    InitConfig,
}

/// Flags given on the command line win over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub model: Option<String>,
    pub no_frames: bool,
    pub skip_transcription: bool,
    pub skip_processed: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output.directory = Some(output.clone());
        }
        if let Some(model) = &self.model {
            config.transcription.model = model.clone();
        }
        if self.no_frames {
            config.frames.enabled = false;
        }
        if self.skip_transcription {
            config.transcription.enabled = false;
        }
        if self.skip_processed {
            config.output.skip_processed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_flags() {
        let cli = Cli::parse_from([
            "framescribe",
            "--verbose",
            "process",
            "a.mp4",
            "lectures",
            "--recursive",
            "--no-frames",
            "--model",
            "small",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Process {
                inputs,
                recursive,
                no_frames,
                model,
                skip_transcription,
                ..
            } => {
                assert_eq!(inputs, vec![PathBuf::from("a.mp4"), PathBuf::from("lectures")]);
                assert!(recursive);
                assert!(no_frames);
                assert!(!skip_transcription);
                assert_eq!(model.as_deref(), Some("small"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_process_requires_inputs() {
        assert!(Cli::try_parse_from(["framescribe", "process"]).is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = Config::default();
        Overrides {
            output: Some(PathBuf::from("/out")),
            model: Some("medium".to_string()),
            no_frames: true,
            skip_transcription: false,
            skip_processed: true,
        }
        .apply(&mut config);
        assert_eq!(config.output.directory, Some(PathBuf::from("/out")));
        assert_eq!(config.transcription.model, "medium");
        assert!(!config.frames.enabled);
        assert!(config.transcription.enabled);
        assert!(config.output.skip_processed);
    }
}
