// ============================================================================
// RasterPad CLI: headless replay of gesture scripts
// ============================================================================
//
// Usage examples:
//   RasterPad --script house.rps --output house.png
//   RasterPad -s "scripts/*.rps" --output-dir renders/ --verbose
//   RasterPad -s a.rps b.rps --output-dir out/ --width 400 --height 300
//
// No window is opened in CLI mode. Each script runs against a fresh canvas
// and the drawable region is exported as PNG.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::components::tools::ToolProperties;
use crate::controller::{CanvasController, EngineConfig};
use crate::io::export_png_to;
use crate::script::{parse_script, run_commands};
use crate::settings::AppSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// RasterPad headless renderer.
///
/// Replay recorded gesture scripts and save the result, no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "RasterPad",
    about = "RasterPad headless gesture-script renderer",
    long_about = "Replay gesture scripts (tool/color/down/move/up/type/undo ...) against a\n\
                  fresh canvas and export the drawable region as PNG.\n\n\
                  Example:\n  \
                  RasterPad --script house.rps --output house.png\n  \
                  RasterPad -s \"scripts/*.rps\" --output-dir renders/"
)]
pub struct CliArgs {
    /// Script file(s). Glob patterns accepted (e.g. "scripts/*.rps").
    #[arg(short, long, required = true, num_args = 1..)]
    pub script: Vec<String>,

    /// Output file path. Only valid for a single script.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for several scripts; files are named after the script stem.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Canvas width (defaults to the saved setting).
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height including the toolbar band (defaults to the saved setting).
    #[arg(long)]
    pub height: Option<u32>,

    /// Print per-script timing and mirror the session log to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when a CLI-mode flag is present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--script" || a == "-s")
    }

    fn engine_config(&self, settings: &AppSettings) -> EngineConfig {
        let mut config = EngineConfig::from(settings);
        if let Some(w) = self.width {
            config.width = w;
        }
        if let Some(h) = self.height {
            config.height = h;
        }
        config
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run every script and return an OS exit code.
/// `0` = all scripts rendered, `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    crate::logger::echo_to_stderr(args.verbose);

    let scripts = resolve_inputs(&args.script);
    if scripts.is_empty() {
        eprintln!("error: no script files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if scripts.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} scripts given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory.",
            scripts.len()
        );
        return ExitCode::FAILURE;
    }

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let settings = AppSettings::load();
    let config = args.engine_config(&settings);
    let total = scripts.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, script_path) in scripts.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, script_path.display());
        }
        let start = Instant::now();

        let Some(output_path) = build_output_path(script_path, args.output.as_deref(), args.output_dir.as_deref())
        else {
            eprintln!("  error: cannot determine output path for '{}'.", script_path.display());
            any_failure = true;
            continue;
        };

        match run_one(script_path, &output_path, &config, &settings) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("CLI: {}: {}", script_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-script pipeline
// ============================================================================

fn run_one(script: &Path, output: &Path, config: &EngineConfig, settings: &AppSettings) -> Result<(), String> {
    let source = std::fs::read_to_string(script).map_err(|e| format!("could not read script: {}", e))?;
    let commands = parse_script(&source).map_err(|e| format!("script error: {}", e))?;

    let mut controller = CanvasController::new(config.clone());
    let mut props = ToolProperties {
        background: config.background,
        shape_fill: settings.shape_fill,
        ..ToolProperties::default()
    };
    props.set_size(settings.brush_size);

    run_commands(&mut controller, &mut props, &commands);

    export_png_to(controller.surface(), output).map_err(|e| format!("save failed: {}", e))
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Output path for one script.
///
/// Priority:
/// 1. `--output`
/// 2. `--output-dir` joined with `<script stem>.png`
/// 3. `<script stem>.png` next to the script
fn build_output_path(script: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = script.file_stem()?.to_string_lossy().into_owned();
    let file_name = format!("{}.png", stem);

    if let Some(dir) = output_dir {
        return Some(dir.join(file_name));
    }
    Some(script.with_file_name(file_name))
}
