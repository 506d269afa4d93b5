// GUI-subsystem binary on Windows release builds: no console window.
// CLI mode output is only visible when launched from a terminal on other platforms
// or from a debug build.
#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use std::process::ExitCode;

use eframe::egui;
use pixelsketch::app::PixelSketchApp;
use pixelsketch::{cli, log_err, logger};

fn main() -> ExitCode {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        return cli::run(args);
    }

    // -- GUI mode -----------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("PixelSketch"),
        ..Default::default()
    };

    match eframe::run_native(
        "PixelSketch",
        options,
        Box::new(|cc| Box::new(PixelSketchApp::new(cc))),
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_err!("GUI failed to start: {}", e);
            eprintln!("error: {}", e);
            if let Some(path) = logger::log_path() {
                eprintln!("session log: {}", path.display());
            }
            ExitCode::FAILURE
        }
    }
}
