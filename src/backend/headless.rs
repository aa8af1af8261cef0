//! Headless backend
//!
//! Keeps a virtual screen in memory instead of drawing to a terminal. The
//! paired `HeadlessController` injects input, resizes the viewport and
//! inspects what was drawn, from any thread.

use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{EventSource, InputMode, RawEvent, TerminalBackend};
use crate::error::BackendError;

/// Virtual screen contents and bookkeeping
#[derive(Debug, Clone, Default)]
pub struct VirtualScreen {
    pub width: u16,
    pub height: u16,
    /// Pending cells, row-major; `None` is blank
    cells: Vec<Option<char>>,
    /// Screen text captured at every flush
    pub flushed: Vec<String>,
    pub initialized: bool,
    pub input_mode: Option<InputMode>,
    pub clears: usize,
    pub cell_writes: usize,
    pub flushes: usize,
    pub syncs: usize,
    pub closes: usize,
}

impl VirtualScreen {
    fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
            ..Self::default()
        }
    }

    /// Glyph at (x, y), if any
    pub fn cell(&self, x: u16, y: u16) -> Option<char> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells[y as usize * self.width as usize + x as usize]
    }

    /// Screen as text, one line per row, blanks as spaces
    pub fn render(&self) -> String {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| self.cell(x, y).unwrap_or(' '))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells = vec![None; width as usize * height as usize];
    }
}

/// Backend half; handed to the engine
pub struct HeadlessBackend {
    screen: Arc<Mutex<VirtualScreen>>,
    events: Receiver<RawEvent>,
    refuse_init: bool,
}

/// Controller half; kept by whoever drives the headless session
#[derive(Clone)]
pub struct HeadlessController {
    screen: Arc<Mutex<VirtualScreen>>,
    events: Sender<RawEvent>,
}

fn lock(screen: &Mutex<VirtualScreen>) -> MutexGuard<'_, VirtualScreen> {
    // A panicked writer leaves the screen readable; keep going
    screen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl HeadlessBackend {
    /// Create a backend with a `width` x `height` viewport
    pub fn new(width: u16, height: u16) -> (Self, HeadlessController) {
        let screen = Arc::new(Mutex::new(VirtualScreen::new(width, height)));
        let (tx, rx) = unbounded();
        (
            Self {
                screen: screen.clone(),
                events: rx,
                refuse_init: false,
            },
            HeadlessController { screen, events: tx },
        )
    }

    /// Make `init` fail, as a terminal without a controlling tty would
    pub fn refuse_init(mut self) -> Self {
        self.refuse_init = true;
        self
    }

    fn screen(&self) -> MutexGuard<'_, VirtualScreen> {
        lock(&self.screen)
    }
}

impl HeadlessController {
    /// Queue an input event for the backend
    pub fn send_event(&self, event: RawEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Change the viewport size; takes effect on the next draw
    pub fn resize(&self, width: u16, height: u16) {
        lock(&self.screen).resize(width, height);
    }

    /// Copy of the current screen state
    pub fn snapshot(&self) -> VirtualScreen {
        lock(&self.screen).clone()
    }

    /// Text of every flushed frame so far
    pub fn flushed(&self) -> Vec<String> {
        lock(&self.screen).flushed.clone()
    }
}

impl TerminalBackend for HeadlessBackend {
    type Events = HeadlessEvents;

    fn init(&mut self) -> Result<(), BackendError> {
        if self.refuse_init {
            return Err(BackendError::Init(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no controlling terminal",
            )));
        }
        self.screen().initialized = true;
        Ok(())
    }

    fn set_input_mode(&mut self, mode: InputMode) -> Result<(), BackendError> {
        self.screen().input_mode = Some(mode);
        Ok(())
    }

    fn events(&self) -> HeadlessEvents {
        HeadlessEvents {
            events: self.events.clone(),
        }
    }

    fn size(&self) -> Result<(u16, u16), BackendError> {
        let screen = self.screen();
        Ok((screen.width, screen.height))
    }

    fn clear(&mut self) -> Result<(), BackendError> {
        let mut screen = self.screen();
        screen.cells.iter_mut().for_each(|cell| *cell = None);
        screen.clears += 1;
        Ok(())
    }

    fn set_cell(&mut self, x: u16, y: u16, glyph: char) -> Result<(), BackendError> {
        let mut screen = self.screen();
        if x < screen.width && y < screen.height {
            let idx = y as usize * screen.width as usize + x as usize;
            screen.cells[idx] = Some(glyph);
        }
        screen.cell_writes += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        let mut screen = self.screen();
        if !screen.initialized {
            return Err(BackendError::NotInitialized);
        }
        let text = screen.render();
        screen.flushed.push(text);
        screen.flushes += 1;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), BackendError> {
        self.screen().syncs += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        let mut screen = self.screen();
        screen.initialized = false;
        screen.closes += 1;
        Ok(())
    }
}

/// Input half of the headless backend
pub struct HeadlessEvents {
    events: Receiver<RawEvent>,
}

impl EventSource for HeadlessEvents {
    fn next_event(&mut self) -> Result<RawEvent, BackendError> {
        self.events.recv().map_err(|_| BackendError::InputClosed)
    }
}
