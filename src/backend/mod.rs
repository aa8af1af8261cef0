//! Terminal backends.
//!
//! The engine only talks to the terminal through `TerminalBackend` (viewport
//! control, owned by the render loop) and `EventSource` (blocking input,
//! owned by the input forwarder).
//!
//! - **console**: crossterm on the process's controlling terminal
//! - **headless**: in-memory virtual screen with scripted input

pub mod console;
pub mod headless;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;

pub use console::ConsoleBackend;
pub use headless::{HeadlessBackend, HeadlessController};

/// Raw terminal event as delivered to the consumer
pub type RawEvent = crossterm::event::Event;

/// Which input the backend reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Keyboard only; Esc arrives as a plain key
    #[default]
    Esc,
    /// Keyboard plus mouse events
    Mouse,
}

/// Viewport side of the terminal
pub trait TerminalBackend: Send + 'static {
    type Events: EventSource;

    fn init(&mut self) -> Result<(), BackendError>;
    fn set_input_mode(&mut self, mode: InputMode) -> Result<(), BackendError>;
    /// Input side; called once per engine start
    fn events(&self) -> Self::Events;

    /// Current viewport size as (width, height). May change between calls.
    fn size(&self) -> Result<(u16, u16), BackendError>;
    fn clear(&mut self) -> Result<(), BackendError>;
    fn set_cell(&mut self, x: u16, y: u16, glyph: char) -> Result<(), BackendError>;
    fn flush(&mut self) -> Result<(), BackendError>;
    fn sync(&mut self) -> Result<(), BackendError>;
    fn close(&mut self) -> Result<(), BackendError>;
}

/// Input side of the terminal
pub trait EventSource: Send + 'static {
    /// Block until the next event arrives
    fn next_event(&mut self) -> Result<RawEvent, BackendError>;
}
