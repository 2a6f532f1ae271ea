use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
};

use log::info;
use scan_engine::{ScanConfig, ScanService};

const USAGE: &str = "usage: scan_engine <image> [overlay-out]";

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(image) = args.next().map(PathBuf::from) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    let overlay_out = args.next().map(PathBuf::from);

    let mut config = match env::var("SCAN_CONFIG") {
        Ok(path) => match ScanConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e:#}");
                return ExitCode::FAILURE;
            }
        },
        Err(_) => ScanConfig::default(),
    };
    if let Ok(path) = env::var("SCAN_MODEL") {
        config.model_path = PathBuf::from(path);
    }

    let service = ScanService::with_default_rng(&config);

    let report = service.classify(&image);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("cannot serialize report: {e}");
            return ExitCode::FAILURE;
        }
    }

    if let Some(out) = overlay_out {
        if service.explain(&image, &out) {
            info!("overlay written to {}", out.display());
        } else {
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
