//! termdraw - play PNG images as a glyph animation in the terminal
//!
//! # Quick Start
//!
//! ```text
//! termdraw walle.png                      # Draw a single image
//! termdraw -g '#' -i 150 a.png b.png c.png  # Cycle three images
//! ```
//!
//! # Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | Esc, q, Ctrl+C | Quit |
//! | d | Toggle drawing (animation keeps cycling) |
//! | b | Blank the screen |
//! | a | Animate all images |
//! | 1-9 | Show a single image |

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use termdraw::{AnimationSpec, Config, ConsoleBackend, Engine, InputMode};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command-line arguments
#[derive(Default)]
struct Args {
    images: Vec<PathBuf>,
    glyph: Option<char>,
    interval_ms: Option<u64>,
    config: Option<PathBuf>,
    mouse: bool,
}

fn print_help() {
    eprintln!("termdraw {} - Glyph animations of PNG images in the terminal", VERSION);
    eprintln!();
    eprintln!("Usage: termdraw [OPTIONS] IMAGE...");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -g, --glyph <CHAR>    Glyph for opaque pixels (default: *)");
    eprintln!("  -i, --interval <MS>   Milliseconds between frames (default: 200)");
    eprintln!("  -c, --config <PATH>   Config file (default: ~/.termdraw/config.toml)");
    eprintln!("  -m, --mouse           Also report mouse events");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Esc, q, Ctrl+C        Quit");
    eprintln!("  d                     Toggle drawing");
    eprintln!("  b                     Blank the screen");
    eprintln!("  a                     Animate all images");
    eprintln!("  1-9                   Show a single image");
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut it = env::args().skip(1);

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                eprintln!("termdraw {}", VERSION);
                std::process::exit(0);
            }
            "-g" | "--glyph" => {
                let value = it.next().ok_or("Missing glyph argument")?;
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => args.glyph = Some(c),
                    _ => return Err(format!("Glyph must be a single character: {:?}", value)),
                }
            }
            "-i" | "--interval" => {
                let value = it.next().ok_or("Missing interval argument")?;
                let ms = value
                    .parse()
                    .map_err(|_| format!("Invalid interval: {}", value))?;
                args.interval_ms = Some(ms);
            }
            "-c" | "--config" => {
                let value = it.next().ok_or("Missing config argument")?;
                args.config = Some(PathBuf::from(value));
            }
            "-m" | "--mouse" => {
                args.mouse = true;
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("Unknown argument: {}. Use -h for help.", flag));
            }
            path => args.images.push(PathBuf::from(path)),
        }
    }

    if args.images.is_empty() {
        return Err("No images given".to_string());
    }
    Ok(args)
}

/// Log to a file; the terminal itself is busy with the animation
fn init_logging(config: &Config) {
    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    // The default file falls back quietly; its error is logged once the
    // subscriber exists
    let (mut config, config_err) = match &args.config {
        Some(path) => (Config::load_from(path)?, None),
        None => match Config::config_path() {
            Some(path) => Config::load_or_default(&path),
            None => (Config::default(), None),
        },
    };
    if let Some(glyph) = args.glyph {
        config.glyph = glyph;
    }
    if let Some(ms) = args.interval_ms {
        config.interval_ms = ms;
    }
    if args.mouse {
        config.input_mode = InputMode::Mouse;
    }

    init_logging(&config);
    if let Some(e) = config_err {
        warn!("{}; using defaults", e);
    }
    info!("termdraw {} starting with {} image(s)", VERSION, args.images.len());

    let images = Engine::<ConsoleBackend>::load_images(&args.images)
        .context("Failed to load images")?;

    let mut engine = Engine::new(ConsoleBackend::new()).with_input_mode(config.input_mode);
    engine.set_display_enabled(config.display);
    engine.start().context("Failed to initialize terminal")?;

    let result = run(&mut engine, &images, &config);
    if let Err(e) = &result {
        error!("Animation failed: {:#}", e);
    }

    // Wait for the terminal to be restored before printing anything
    engine.stop();
    engine.wait_stopped()?;
    info!("termdraw exiting");

    result
}

fn run(
    engine: &mut Engine<ConsoleBackend>,
    images: &[image::DynamicImage],
    config: &Config,
) -> anyhow::Result<()> {
    let events = engine.input_events()?;
    engine.submit_animation(images, config.glyph, config.interval())?;
    let mut display = config.display;

    for event in events.iter() {
        let Event::Key(key) = event else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => break,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
            KeyCode::Char('d') => {
                display = !display;
                engine.set_display_enabled(display);
            }
            KeyCode::Char('b') => engine.submit(AnimationSpec::blank())?,
            KeyCode::Char('a') => {
                engine.submit_animation(images, config.glyph, config.interval())?;
            }
            KeyCode::Char(c @ '1'..='9') => {
                let idx = c as usize - '1' as usize;
                if let Some(img) = images.get(idx) {
                    engine.submit_animation(
                        std::slice::from_ref(img),
                        config.glyph,
                        config.interval(),
                    )?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}
