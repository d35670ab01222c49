// ============================================================================
// ColorBook CLI: headless replay of recorded painting sessions
// ============================================================================
//
// Usage examples:
//   ColorBook --input stroke.toml --output page.png
//   ColorBook -i scripts/*.toml --config book.toml --output-dir out/
//   ColorBook -i fill.toml --store saves/ --verbose
//
// Each script is replayed on a fresh session built from the config, then the
// final canvas is written as PNG.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use crate::components::tools::DrawMode;
use crate::config::SessionConfig;
use crate::error::{PaintError, PaintResult};
use crate::io::{BlobStore, FileBlobStore};
use crate::session::{PaintSession, PointerEvent};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// ColorBook headless session replayer.
#[derive(Parser, Debug)]
#[command(
    name = "ColorBook",
    about = "Replay coloring-book painting scripts and export the result",
    long_about = "Replay TOML action scripts (pointer events, tool changes, undo/redo)\n\
                  against a coloring page and write the final canvas as PNG.\n\n\
                  Example:\n  \
                  ColorBook --input stroke.toml --output page.png\n  \
                  ColorBook -i 'scripts/*.toml' --config book.toml --output-dir out/"
)]
pub struct CliArgs {
    /// Script file(s). Glob patterns accepted (e.g. "scripts/*.toml").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Session config (template, palette, brush sizes, stickers).
    /// Defaults apply when omitted.
    #[arg(short, long, value_name = "CONFIG.toml")]
    pub config: Option<PathBuf>,

    /// Output PNG path. Only valid for a single script.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch replay. Files are named after the script stem.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory for saved canvases; overrides the config's `store_dir`.
    #[arg(long, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Debug-level logging and per-script timing.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Script format
// ============================================================================

/// One recorded step of a session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Press { x: i32, y: i32 },
    Drag { x: i32, y: i32 },
    Release { x: i32, y: i32 },
    Leave,
    Undo,
    Redo,
    Clear,
    Mode { mode: DrawMode },
    Color { index: usize },
    Rgba { rgba: [u8; 4] },
    BrushSize,
    Sticker { index: usize },
    Save,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Script {
    /// Start from the canvas saved under the config's key.
    pub restore: bool,
    pub actions: Vec<Action>,
}

impl Script {
    pub fn parse(path: &Path, source: &str) -> PaintResult<Self> {
        toml::from_str(source).map_err(|e| PaintError::Script {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> PaintResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(path, &source)
    }
}

/// Apply every action of `script` to `session`, in order.
pub fn replay(
    session: &mut PaintSession,
    script: &Script,
    store: &mut dyn BlobStore,
) -> PaintResult<()> {
    if script.restore {
        session.restore_or_blank(store);
    }
    for action in &script.actions {
        match *action {
            Action::Press { x, y } => session.handle(PointerEvent::press(x, y)),
            Action::Drag { x, y } => session.handle(PointerEvent::drag(x, y)),
            Action::Release { x, y } => session.handle(PointerEvent::release(x, y)),
            Action::Leave => session.handle(PointerEvent::leave()),
            Action::Undo => {
                session.undo();
            }
            Action::Redo => {
                session.redo();
            }
            Action::Clear => session.clear_canvas(),
            Action::Mode { mode } => session.set_draw_mode(mode),
            Action::Color { index } => {
                if session.select_color(index).is_none() {
                    warn!("palette index {index} out of range, color unchanged");
                }
            }
            Action::Rgba { rgba } => session.set_paint_color(image::Rgba(rgba)),
            Action::BrushSize => {
                session.cycle_brush_size();
            }
            Action::Sticker { index } => session.select_sticker(index)?,
            Action::Save => session.save(store)?,
        }
    }
    Ok(())
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all scripts succeeded, `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} scripts given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let config = match &args.config {
        Some(path) => match SessionConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: could not load config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => SessionConfig::default(),
    };

    let mut store = match args.store.clone().or_else(|| config.store_dir.clone()) {
        Some(dir) => FileBlobStore::new(dir),
        None => FileBlobStore::in_data_dir(),
    };
    info!(store = %store.dir().display(), scripts = inputs.len(), "replay starting");

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let started = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref())
        else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &config, &mut store) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  -> {} ({:.0}ms)",
                        output_path.display(),
                        started.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_one(
    input: &Path,
    output: &Path,
    config: &SessionConfig,
    store: &mut dyn BlobStore,
) -> PaintResult<()> {
    let script = Script::load(input)?;
    let mut session = PaintSession::from_config(config)?;
    replay(&mut session, &script, store)?;
    session.export_png(output)?;
    info!(
        script = %input.display(),
        actions = script.actions.len(),
        history = session.history().len(),
        "replay finished"
    );
    Ok(())
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
/// 1. `--output` (explicit path, single script)
/// 2. `--output-dir` (batch directory, named after the script stem)
/// 3. Fallback: next to the script, same stem, `.png`
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();
    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{stem}.png")));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{stem}.png")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryBlobStore;
    use image::Rgba;

    #[test]
    fn parses_tagged_actions() {
        let script = Script::parse(
            Path::new("s.toml"),
            r#"
            [[actions]]
            kind = "mode"
            mode = "paint_bucket"

            [[actions]]
            kind = "press"
            x = 3
            y = 4

            [[actions]]
            kind = "leave"

            [[actions]]
            kind = "rgba"
            rgba = [1, 2, 3, 255]

            [[actions]]
            kind = "brush_size"
            "#,
        )
        .unwrap();
        assert!(!script.restore);
        assert_eq!(
            script.actions,
            vec![
                Action::Mode { mode: DrawMode::PaintBucket },
                Action::Press { x: 3, y: 4 },
                Action::Leave,
                Action::Rgba { rgba: [1, 2, 3, 255] },
                Action::BrushSize,
            ]
        );
    }

    #[test]
    fn unknown_action_is_a_script_error() {
        let err = Script::parse(Path::new("bad.toml"), "[[actions]]\nkind = \"smudge\"\n")
            .unwrap_err();
        assert!(matches!(err, PaintError::Script { .. }));
    }

    #[test]
    fn replay_fills_and_saves() {
        let mut session = PaintSession::new(10, 10).unwrap();
        let mut store = MemoryBlobStore::new();
        let script = Script {
            restore: false,
            actions: vec![
                Action::Mode { mode: DrawMode::PaintBucket },
                Action::Rgba { rgba: [0, 0, 255, 255] },
                Action::Press { x: 5, y: 5 },
                Action::Release { x: 5, y: 5 },
                Action::Save,
            ],
        };
        replay(&mut session, &script, &mut store).unwrap();

        assert_eq!(session.canvas().get(0, 9), Rgba([0, 0, 255, 255]));
        assert_eq!(session.history().len(), 2);
        assert_eq!(
            store.load(session.save_key()).unwrap().as_deref(),
            Some(session.current_bytes())
        );
    }

    #[test]
    fn replay_rejects_missing_sticker() {
        let mut session = PaintSession::new(4, 4).unwrap();
        let script = Script {
            restore: false,
            actions: vec![Action::Sticker { index: 2 }],
        };
        let err = replay(&mut session, &script, &mut MemoryBlobStore::new()).unwrap_err();
        assert!(matches!(err, PaintError::UnknownSticker(2)));
    }

    #[test]
    fn batch_run_reports_failure_but_keeps_good_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("good.toml"),
            "[[actions]]\nkind = \"press\"\nx = 5\ny = 5\n\n\
             [[actions]]\nkind = \"release\"\nx = 5\ny = 5\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.toml"), "[[actions]]\nkind = \"smudge\"\n").unwrap();
        let out = dir.path().join("out");

        let args = CliArgs {
            input: vec![dir.path().join("*.toml").to_string_lossy().into_owned()],
            config: None,
            output: None,
            output_dir: Some(out.clone()),
            store: Some(dir.path().join("saves")),
            verbose: false,
        };
        assert_eq!(run(args), ExitCode::FAILURE);
        assert!(out.join("good.png").exists());
        assert!(!out.join("bad.png").exists());
    }

    #[test]
    fn run_succeeds_when_every_script_does() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("clear.toml");
        std::fs::write(&script, "[[actions]]\nkind = \"clear\"\n").unwrap();
        let output = dir.path().join("page.png");

        let args = CliArgs {
            input: vec![script.to_string_lossy().into_owned()],
            config: None,
            output: Some(output.clone()),
            output_dir: None,
            store: Some(dir.path().join("saves")),
            verbose: false,
        };
        assert_eq!(run(args), ExitCode::SUCCESS);
        assert!(output.exists());
    }

    #[test]
    fn inputs_expand_globs_and_dedupe() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.toml", "b.toml", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let literal = dir.path().join("a.toml");
        let pattern = dir.path().join("*.toml");
        let inputs = resolve_inputs(&[
            literal.to_string_lossy().into_owned(),
            pattern.to_string_lossy().into_owned(),
            dir.path().join("none*.toml").to_string_lossy().into_owned(),
        ]);
        assert_eq!(inputs, vec![literal, dir.path().join("b.toml")]);
    }

    #[test]
    fn output_path_priority() {
        let input = Path::new("scripts/fill.toml");
        assert_eq!(
            build_output_path(input, Some(Path::new("a.png")), Some(Path::new("out"))),
            Some(PathBuf::from("a.png"))
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out"))),
            Some(PathBuf::from("out/fill.png"))
        );
        assert_eq!(
            build_output_path(input, None, None),
            Some(PathBuf::from("scripts/fill.png"))
        );
    }
}
