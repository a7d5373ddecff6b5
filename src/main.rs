// GUI-subsystem binary on Windows. In CLI mode (--script/-s) the process
// attaches to the parent console so println!/eprintln! reach the terminal.
#![windows_subsystem = "windows"]

use eframe::egui;
use rasterpad::app::RasterPadApp;
use rasterpad::settings::AppSettings;
use rasterpad::{cli, logger};

fn main() -> Result<(), eframe::Error> {
    #[cfg(target_os = "windows")]
    if cli::CliArgs::is_cli_mode() {
        unsafe extern "system" {
            fn AttachConsole(dwProcessId: u32) -> i32;
        }
        const ATTACH_PARENT_PROCESS: u32 = 0xFFFF_FFFF;
        unsafe {
            AttachConsole(ATTACH_PARENT_PROCESS);
        }
    }

    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        logger::init();
        let args = cli::CliArgs::parse();
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS { 0 } else { 1 });
    }

    // -- GUI mode -----------------------------------------------------
    logger::init();

    let settings = AppSettings::load();
    let size = [settings.canvas_width as f32, settings.canvas_height as f32];

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(size)
            .with_resizable(false)
            .with_title("RasterPad"),
        ..Default::default()
    };

    eframe::run_native(
        "RasterPad",
        options,
        Box::new(move |cc| Box::new(RasterPadApp::new(cc, settings))),
    )
}
