use clap::Parser;
use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// Command-line surface of the agent. Every value here overrides the file.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "AGODS - captures a frame, detects objects of interest and sounds the alarm"
)]
pub struct Args {
    /// Configuration file (TOML, or JSON when the name ends in .json).
    #[arg(long, env = "AGODS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model file for the inference engine ("stub://..." for the built-in stub).
    #[arg(long)]
    pub model: Option<String>,

    /// Label file, one label per line.
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// Minimum detection score, 0..=1.
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Where debug mode writes the captured frame.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Seconds to sleep after each cycle.
    #[arg(long)]
    pub interval: Option<u64>,

    /// Save each frame, print detections and log at debug level.
    #[arg(long)]
    pub debug: bool,

    /// Run the PIR motion-sensor deployment instead of the camera.
    #[arg(long)]
    pub motion: bool,
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config: self.config.clone(),
            model: self.model.clone(),
            labels: self.labels.clone(),
            threshold: self.threshold,
            image: self.image.clone(),
            interval: self.interval,
            debug: self.debug,
            motion: self.motion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn flags_map_to_overrides() {
        let args = Args::try_parse_from([
            "agods",
            "--model",
            "detect.onnx",
            "--threshold",
            "0.7",
            "--interval",
            "10",
            "--debug",
        ])
        .unwrap();
        let overrides = args.overrides();
        assert_eq!(overrides.model.as_deref(), Some("detect.onnx"));
        assert_eq!(overrides.threshold, Some(0.7));
        assert_eq!(overrides.interval, Some(10));
        assert!(overrides.debug);
        assert!(!overrides.motion);
    }

    #[test]
    fn help_is_a_display_request() {
        let err = Args::try_parse_from(["agods", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn malformed_threshold_is_rejected() {
        assert!(Args::try_parse_from(["agods", "--threshold", "high"]).is_err());
    }
}
