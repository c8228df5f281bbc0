use std::path::PathBuf;

use svbrdf_core::constants::{DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH};

/// Command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub data_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub rw_presets: bool,
    pub config: Option<PathBuf>,
    /// Set when `--width` or `--height` was given, so they override the config.
    pub explicit_size: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
            rw_presets: false,
            config: None,
            explicit_size: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgsOutcome {
    Run(Args),
    Help,
    Invalid(String),
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [--help] [--data DATA_DIRECTORY] [--width WIDTH] [--height HEIGHT] [--rw-presets] [--config FILE]\n\
         \x20  --help                 Print these usage instructions.\n\
         \x20  --data DATA_DIRECTORY  Use DATA_DIRECTORY as the data directory (default: data).\n\
         \x20  --width WIDTH          Width of the created window (default: {DEFAULT_WINDOW_WIDTH}).\n\
         \x20  --height HEIGHT        Height of the created window (default: {DEFAULT_WINDOW_HEIGHT}).\n\
         \x20  --rw-presets           Allow saving presets with Ctrl + F1...F10.\n\
         \x20  --config FILE          Load viewer settings from a RON file."
    )
}

/// Parse arguments, not including the program name.
pub fn parse_args(args: &[String]) -> ArgsOutcome {
    let mut parsed = Args::default();
    let mut it = args.iter();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--data" => match it.next() {
                Some(dir) => parsed.data_dir = PathBuf::from(dir),
                None => return ArgsOutcome::Invalid("--data needs a directory".into()),
            },
            "--width" => match it.next().and_then(|v| v.parse::<u32>().ok()) {
                Some(w) if w > 0 => {
                    parsed.width = w;
                    parsed.explicit_size = true;
                }
                _ => return ArgsOutcome::Invalid("--width needs a positive integer".into()),
            },
            "--height" => match it.next().and_then(|v| v.parse::<u32>().ok()) {
                Some(h) if h > 0 => {
                    parsed.height = h;
                    parsed.explicit_size = true;
                }
                _ => return ArgsOutcome::Invalid("--height needs a positive integer".into()),
            },
            "--rw-presets" => parsed.rw_presets = true,
            "--config" => match it.next() {
                Some(file) => parsed.config = Some(PathBuf::from(file)),
                None => return ArgsOutcome::Invalid("--config needs a file".into()),
            },
            "--help" | "-h" => return ArgsOutcome::Help,
            other => return ArgsOutcome::Invalid(format!("Unknown argument: {other}")),
        }
    }

    ArgsOutcome::Run(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let ArgsOutcome::Run(args) = parse_args(&[]) else {
            panic!("expected Run");
        };
        assert_eq!(args, Args::default());
        assert_eq!(args.data_dir, PathBuf::from("data"));
        assert_eq!((args.width, args.height), (1600, 900));
        assert!(!args.rw_presets);
    }

    #[test]
    fn test_all_flags() {
        let outcome = parse_args(&strings(&[
            "--data",
            "/tmp/materials",
            "--width",
            "800",
            "--height",
            "600",
            "--rw-presets",
            "--config",
            "viewer.ron",
        ]));
        let ArgsOutcome::Run(args) = outcome else {
            panic!("expected Run");
        };
        assert_eq!(args.data_dir, PathBuf::from("/tmp/materials"));
        assert_eq!((args.width, args.height), (800, 600));
        assert!(args.rw_presets);
        assert!(args.explicit_size);
        assert_eq!(args.config, Some(PathBuf::from("viewer.ron")));
    }

    #[test]
    fn test_help() {
        assert_eq!(parse_args(&strings(&["--help"])), ArgsOutcome::Help);
        assert_eq!(parse_args(&strings(&["--rw-presets", "-h"])), ArgsOutcome::Help);
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(
            parse_args(&strings(&["--bogus"])),
            ArgsOutcome::Invalid(_)
        ));
        assert!(matches!(
            parse_args(&strings(&["--width"])),
            ArgsOutcome::Invalid(_)
        ));
        assert!(matches!(
            parse_args(&strings(&["--height", "tall"])),
            ArgsOutcome::Invalid(_)
        ));
        assert!(matches!(
            parse_args(&strings(&["--width", "0"])),
            ArgsOutcome::Invalid(_)
        ));
    }

    #[test]
    fn test_usage_mentions_every_flag() {
        let text = usage("svbrdf-viewer");
        for flag in ["--help", "--data", "--width", "--height", "--rw-presets", "--config"] {
            assert!(text.contains(flag), "missing {flag}");
        }
    }
}
