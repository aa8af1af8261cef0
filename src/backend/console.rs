//! Console backend using crossterm
//!
//! Draws into the alternate screen of the controlling terminal. Cell writes
//! are queued into a buffered writer and only reach the terminal on `flush`.

use std::io::{self, BufWriter, Stdout, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Print, ResetColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use tracing::debug;

use super::{EventSource, InputMode, RawEvent, TerminalBackend};
use crate::error::BackendError;

/// Backend bound to the process's stdout
pub struct ConsoleBackend {
    out: BufWriter<Stdout>,
    initialized: bool,
    mouse: bool,
    /// Inside a synchronized update started by `clear`
    in_update: bool,
}

impl Default for ConsoleBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleBackend {
    pub fn new() -> Self {
        Self {
            out: BufWriter::with_capacity(65536, io::stdout()),
            initialized: false,
            mouse: false,
            in_update: false,
        }
    }

    fn ensure_initialized(&self) -> Result<(), BackendError> {
        if self.initialized {
            Ok(())
        } else {
            Err(BackendError::NotInitialized)
        }
    }
}

impl TerminalBackend for ConsoleBackend {
    type Events = ConsoleEvents;

    fn init(&mut self) -> Result<(), BackendError> {
        if self.initialized {
            return Ok(());
        }
        debug!("Enabling raw mode");
        terminal::enable_raw_mode().map_err(BackendError::Init)?;

        let setup = execute!(
            self.out,
            EnterAlternateScreen,
            DisableLineWrap,
            Hide,
            Clear(ClearType::All),
            MoveTo(0, 0)
        );
        if let Err(e) = setup {
            let _ = terminal::disable_raw_mode();
            return Err(BackendError::Init(e));
        }

        self.initialized = true;
        Ok(())
    }

    fn set_input_mode(&mut self, mode: InputMode) -> Result<(), BackendError> {
        self.ensure_initialized()?;
        match mode {
            InputMode::Mouse if !self.mouse => execute!(self.out, EnableMouseCapture)?,
            InputMode::Esc if self.mouse => execute!(self.out, DisableMouseCapture)?,
            _ => {}
        }
        self.mouse = mode == InputMode::Mouse;
        debug!("Input mode: {:?}", mode);
        Ok(())
    }

    fn events(&self) -> ConsoleEvents {
        ConsoleEvents
    }

    fn size(&self) -> Result<(u16, u16), BackendError> {
        Ok(terminal::size()?)
    }

    fn clear(&mut self) -> Result<(), BackendError> {
        self.ensure_initialized()?;
        if !self.in_update {
            queue!(self.out, BeginSynchronizedUpdate)?;
            self.in_update = true;
        }
        queue!(self.out, Clear(ClearType::All))?;
        Ok(())
    }

    fn set_cell(&mut self, x: u16, y: u16, glyph: char) -> Result<(), BackendError> {
        self.ensure_initialized()?;
        queue!(self.out, MoveTo(x, y), Print(glyph))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        self.ensure_initialized()?;
        if self.in_update {
            queue!(self.out, EndSynchronizedUpdate)?;
            self.in_update = false;
        }
        self.out.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), BackendError> {
        // Nothing is cached on our side, so a resync is a full flush
        self.flush()
    }

    fn close(&mut self) -> Result<(), BackendError> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        if self.mouse {
            let _ = execute!(self.out, DisableMouseCapture);
            self.mouse = false;
        }
        let _ = execute!(self.out, ResetColor, Show, EnableLineWrap, LeaveAlternateScreen);
        let _ = self.out.flush();

        // Raw mode is the part that leaves the shell unusable if skipped
        terminal::disable_raw_mode()?;
        Ok(())
    }
}

impl Drop for ConsoleBackend {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Blocking reader over crossterm's global event queue
pub struct ConsoleEvents;

impl EventSource for ConsoleEvents {
    fn next_event(&mut self) -> Result<RawEvent, BackendError> {
        Ok(event::read()?)
    }
}
