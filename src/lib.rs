//! termdraw - monochrome glyph animations of raster images in a terminal
//!
//! Images are thresholded on their alpha channel into opacity bitmaps and
//! cycled on a timer, one glyph per opaque pixel. Terminal input is forwarded
//! to the caller while the animation runs.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use termdraw::{ConsoleBackend, Engine};
//!
//! # fn main() -> termdraw::Result<()> {
//! let images = Engine::<ConsoleBackend>::load_images(&["walle.png", "walle_talk.png"])?;
//!
//! let mut engine = Engine::new(ConsoleBackend::new());
//! engine.start()?;
//! engine.submit_animation(&images, '*', Duration::from_millis(200))?;
//!
//! let events = engine.input_events()?;
//! let _first = events.recv();
//!
//! engine.stop();
//! engine.wait_stopped()?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;

pub use backend::{ConsoleBackend, HeadlessBackend, HeadlessController, InputMode, RawEvent};
pub use config::Config;
pub use crate::core::{load_images, AnimationSpec, Frame};
pub use engine::Engine;
pub use error::{BackendError, ConfigError, DecodeError, EngineError, Result, SpecError};
