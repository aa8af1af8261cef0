//! Render loop
//!
//! Single owner of all display state: the active spec, the frame cursor, the
//! display toggle, the frame timer and the terminal session. Spec updates,
//! timer ticks and shutdown requests are taken one at a time from a
//! three-way select, so a draw never sees a half-replaced spec.
//!
//! # States
//!
//! ```text
//!            spec (≥1 frame)            spec (≥1 frame)
//!   Idle ─────────────────────▶ Animating ◀──────────┐
//!    ▲                            │  └───────────────┘
//!    └────── spec (0 frames) ─────┘
//!
//!   any ──shutdown──▶ Stopping ──teardown──▶ Stopped
//! ```

use std::time::Instant;

use crossbeam_channel::{never, select, tick, Receiver};
use tracing::{debug, info, warn};

use super::session::TerminalSession;
use crate::backend::TerminalBackend;
use crate::core::AnimationSpec;
use crate::error::BackendError;

/// Messages accepted over the render loop's command queue
#[derive(Debug)]
pub enum Command {
    /// Replace the active animation
    Animate(AnimationSpec),
    /// Toggle terminal writes without stopping the animation clock
    SetDisplay(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Animating,
    Stopping,
    Stopped,
}

pub struct RenderLoop<B: TerminalBackend> {
    session: TerminalSession<B>,
    spec: AnimationSpec,
    cursor: usize,
    display_enabled: bool,
    state: LoopState,
    /// Frame timer; `never()` while idle
    ticker: Receiver<Instant>,
}

impl<B: TerminalBackend> RenderLoop<B> {
    pub fn new(session: TerminalSession<B>, display_enabled: bool) -> Self {
        Self {
            session,
            spec: AnimationSpec::blank(),
            cursor: 0,
            display_enabled,
            state: LoopState::Idle,
            ticker: never(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Serve commands and ticks until shutdown, then tear the session down.
    ///
    /// A disconnected command or shutdown queue counts as a shutdown request.
    /// Returns the backend so the engine can start again later.
    pub fn run(mut self, commands: Receiver<Command>, shutdown: Receiver<()>) -> Option<B> {
        debug!("Render loop started");
        loop {
            // Cloned so the select does not hold a borrow of `self`
            let ticker = self.ticker.clone();
            select! {
                recv(commands) -> msg => match msg {
                    Ok(cmd) => self.handle(cmd),
                    Err(_) => {
                        debug!("Command queue closed");
                        break;
                    }
                },
                recv(ticker) -> _ => self.tick(),
                recv(shutdown) -> _ => break,
            }
        }
        self.shutdown()
    }

    pub fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Animate(spec) => self.replace_spec(spec),
            Command::SetDisplay(enabled) => {
                debug!("Display enabled: {}", enabled);
                self.display_enabled = enabled;
            }
        }
    }

    fn replace_spec(&mut self, spec: AnimationSpec) {
        if matches!(self.state, LoopState::Stopping | LoopState::Stopped) {
            return;
        }
        info!(
            "New animation: {} frame(s), glyph {:?}, interval {:?}",
            spec.frame_count(),
            spec.glyph(),
            spec.interval()
        );

        self.spec = spec;
        self.cursor = 0;

        if self.spec.is_blank() {
            // Dropping the old receiver cancels the old timer
            self.ticker = never();
            self.set_state(LoopState::Idle);
            if self.display_enabled {
                if let Err(e) = self.blank() {
                    warn!("Failed to blank display: {}", e);
                }
            }
        } else {
            self.ticker = tick(self.spec.interval());
            self.set_state(LoopState::Animating);
        }
    }

    /// Draw the frame under the cursor, then advance the cursor.
    pub fn tick(&mut self) {
        if self.state != LoopState::Animating {
            return;
        }
        let count = self.spec.frame_count();
        if count == 0 {
            return;
        }

        if self.display_enabled {
            if let Err(e) = self.draw() {
                warn!("Failed to draw frame {}: {}", self.cursor, e);
            }
        }
        self.cursor = (self.cursor + 1) % count;
    }

    fn draw(&mut self) -> Result<(), BackendError> {
        let frame = match self.spec.frames().get(self.cursor) {
            Some(frame) => frame,
            None => return Ok(()),
        };
        let glyph = self.spec.glyph();
        let backend = self.session.backend()?;

        // Size is read fresh: the terminal may have been resized since the
        // last frame
        let (w, h) = backend.size()?;
        let cols = frame.width().min(w as usize);
        let rows = frame.height().min(h as usize);

        backend.clear()?;
        for y in 0..rows {
            for x in 0..cols {
                if frame.is_opaque(x, y) {
                    backend.set_cell(x as u16, y as u16, glyph)?;
                }
            }
        }
        backend.flush()
    }

    fn blank(&mut self) -> Result<(), BackendError> {
        let backend = self.session.backend()?;
        backend.clear()?;
        backend.flush()
    }

    /// Tear down the terminal session. Only the first call has any effect.
    pub fn shutdown(&mut self) -> Option<B> {
        if matches!(self.state, LoopState::Stopping | LoopState::Stopped) {
            return None;
        }
        self.set_state(LoopState::Stopping);
        self.ticker = never();
        let backend = self.session.release();
        self.set_state(LoopState::Stopped);
        info!("Render loop stopped");
        backend
    }

    fn set_state(&mut self, state: LoopState) {
        if self.state != state {
            debug!("Render loop {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}
