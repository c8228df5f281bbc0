mod args;
mod collections;
mod config;
mod controls;
mod error;
mod session;
mod timing;
mod viewer;
mod vr;

use std::process;

use args::{parse_args, usage, ArgsOutcome};
use config::ViewerConfig;
use viewer::{Viewer, ViewerOptions};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = std::env::args().collect();
    let program = argv.first().map_or("svbrdf-viewer", String::as_str);

    let args = match parse_args(argv.get(1..).unwrap_or_default()) {
        ArgsOutcome::Run(args) => args,
        ArgsOutcome::Help => {
            println!("{}", usage(program));
            process::exit(0);
        }
        ArgsOutcome::Invalid(message) => {
            eprintln!("{message}");
            eprintln!("{}", usage(program));
            process::exit(1);
        }
    };

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path).unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        }),
        None => ViewerConfig::default(),
    };
    config.apply_args(&args);

    log::info!("Data directory: {}", args.data_dir.display());
    let viewer = Viewer::new(ViewerOptions {
        data_dir: args.data_dir,
        rw_presets: args.rw_presets,
        config,
    });
    if let Err(e) = viewer.run() {
        log::error!("Aborting: {e}");
        process::exit(1);
    }
}
