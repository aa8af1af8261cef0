//! Animation engine.
//!
//! The `Engine` is what a host program holds. Starting it acquires the
//! terminal and spawns two threads:
//!
//! - **render**: owns the display state and the terminal session
//!   (`render::RenderLoop`)
//! - **input**: republishes raw terminal events (`input::spawn`)
//!
//! # Architecture
//!
//! ```text
//! Engine ──Command (rendezvous)──▶ RenderLoop ──▶ TerminalBackend
//!   │    ──shutdown (try_send)───▶     ▲ tick
//!   │
//!   ◀──RawEvent (rendezvous)── input forwarder ◀── EventSource
//! ```
//!
//! The threads share no memory with the engine or with each other; all
//! coordination is message passing.

mod input;
mod render;
mod session;

use std::io;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, SendError, Sender};
use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::backend::{InputMode, RawEvent, TerminalBackend};
use crate::core::{self as convert, AnimationSpec};
use crate::error::{EngineError, Result};

use render::{Command, RenderLoop};
use session::TerminalSession;

/// Channels and threads of a started engine
struct Running<B: TerminalBackend> {
    commands: Sender<Command>,
    stop_render: Sender<()>,
    stop_input: Sender<()>,
    events: Receiver<RawEvent>,
    render: JoinHandle<Option<B>>,
}

pub struct Engine<B: TerminalBackend> {
    /// Present whenever the engine is not running
    backend: Option<B>,
    input_mode: InputMode,
    display_enabled: bool,
    running: Option<Running<B>>,
    /// Render thread of a stopped run that has not been joined yet
    stopping: Option<JoinHandle<Option<B>>>,
}

impl<B: TerminalBackend> Engine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Some(backend),
            input_mode: InputMode::default(),
            display_enabled: true,
            running: None,
            stopping: None,
        }
    }

    /// Input mode applied on the next `start`
    pub fn with_input_mode(mut self, mode: InputMode) -> Self {
        self.input_mode = mode;
        self
    }

    /// Decode image files for later submission. See `core::load_images`.
    pub fn load_images<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<DynamicImage>> {
        Ok(convert::load_images(paths)?)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Acquire the terminal and spawn the render loop and input forwarder.
    ///
    /// If a previous run was stopped, waits for its teardown first. On
    /// failure the engine stays unstarted.
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        self.wait_stopped()?;

        let mut backend = self.backend.take().ok_or(EngineError::BackendLost)?;
        if let Err(e) = backend.init() {
            self.backend = Some(backend);
            return Err(e.into());
        }
        if let Err(e) = backend.set_input_mode(self.input_mode) {
            let _ = backend.close();
            self.backend = Some(backend);
            return Err(e.into());
        }
        let event_source = backend.events();

        let (cmd_tx, cmd_rx) = bounded(0);
        let (stop_render_tx, stop_render_rx) = bounded(1);
        let (stop_input_tx, stop_input_rx) = bounded(1);
        let (event_tx, event_rx) = bounded(0);

        let render_loop = RenderLoop::new(TerminalSession::new(backend), self.display_enabled);
        let spawn = |body: RenderBody<B>| {
            thread::Builder::new()
                .name("termdraw-render".to_string())
                .spawn(body)
        };
        let render = match spawn_render(render_loop, cmd_rx, stop_render_rx, spawn) {
            Ok(handle) => handle,
            Err((source, backend)) => {
                self.backend = backend;
                return Err(EngineError::Spawn {
                    name: "render",
                    source,
                });
            }
        };

        if let Err(source) = input::spawn(event_source, stop_input_rx, event_tx) {
            let _ = stop_render_tx.try_send(());
            self.stopping = Some(render);
            return Err(EngineError::Spawn {
                name: "input",
                source,
            });
        }

        self.running = Some(Running {
            commands: cmd_tx,
            stop_render: stop_render_tx,
            stop_input: stop_input_tx,
            events: event_rx,
            render,
        });
        info!("Engine started (input mode {:?})", self.input_mode);
        Ok(())
    }

    /// Convert `images` and display them as the new animation.
    ///
    /// Blocks until the render loop takes the spec; at most one spec is ever
    /// in flight.
    pub fn submit_animation(
        &self,
        images: &[DynamicImage],
        glyph: char,
        interval: Duration,
    ) -> Result<()> {
        if self.running.is_none() {
            return Err(EngineError::NotRunning);
        }
        let spec = AnimationSpec::from_images(images, glyph, interval)?;
        self.submit(spec)
    }

    /// Hand an already built spec to the render loop
    pub fn submit(&self, spec: AnimationSpec) -> Result<()> {
        let running = self.running.as_ref().ok_or(EngineError::NotRunning)?;
        running
            .commands
            .send(Command::Animate(spec))
            .map_err(|_| EngineError::NotRunning)
    }

    /// Enable or suppress terminal writes.
    ///
    /// Before `start` this sets the initial value. While running, frames keep
    /// cycling either way; only drawing is affected.
    pub fn set_display_enabled(&mut self, enabled: bool) {
        if let Some(running) = &self.running {
            if running.commands.send(Command::SetDisplay(enabled)).is_err() {
                warn!("Render loop is gone; display toggle not delivered");
                return;
            }
        }
        self.display_enabled = enabled;
    }

    pub fn display_enabled(&self) -> bool {
        self.display_enabled
    }

    /// Raw terminal events. The stream closes once the engine has stopped and
    /// the forwarder has exited.
    pub fn input_events(&self) -> Result<Receiver<RawEvent>> {
        self.running
            .as_ref()
            .map(|running| running.events.clone())
            .ok_or(EngineError::NotRunning)
    }

    /// Request shutdown of both threads without waiting for it.
    ///
    /// Calling it again, or on an engine that never started, does nothing.
    /// Use `wait_stopped` to wait for the terminal to be released.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            debug!("Stop requested on an engine that is not running");
            return;
        };

        // Non-blocking: either thread may be parked where it cannot answer yet
        let _ = running.stop_render.try_send(());
        let _ = running.stop_input.try_send(());
        self.stopping = Some(running.render);
        info!("Engine stop requested");
    }

    /// Block until a stopped engine has released the terminal.
    ///
    /// Returns immediately if nothing is pending. Fails with `AlreadyRunning`
    /// if `stop` was not called first.
    pub fn wait_stopped(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        let Some(handle) = self.stopping.take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(Some(backend)) => {
                self.backend = Some(backend);
                debug!("Engine fully stopped");
                Ok(())
            }
            Ok(None) | Err(_) => Err(EngineError::BackendLost),
        }
    }
}

/// Boxed body of the render thread
type RenderBody<B> = Box<dyn FnOnce() -> Option<B> + Send>;

/// Start the render loop on a thread created by `spawn`.
///
/// The loop only crosses over once the thread exists, so a failed spawn
/// tears the session down here and returns the backend with the error.
fn spawn_render<B, F>(
    render_loop: RenderLoop<B>,
    commands: Receiver<Command>,
    shutdown: Receiver<()>,
    spawn: F,
) -> std::result::Result<JoinHandle<Option<B>>, (io::Error, Option<B>)>
where
    B: TerminalBackend,
    F: FnOnce(RenderBody<B>) -> io::Result<JoinHandle<Option<B>>>,
{
    let (handoff_tx, handoff_rx) = bounded::<RenderLoop<B>>(1);
    let body: RenderBody<B> = Box::new(move || {
        let render_loop = handoff_rx.recv().ok()?;
        render_loop.run(commands, shutdown)
    });

    match spawn(body) {
        Ok(handle) => match handoff_tx.send(render_loop) {
            Ok(()) => Ok(handle),
            Err(SendError(mut render_loop)) => Err((
                io::Error::new(io::ErrorKind::Other, "render thread exited before handoff"),
                render_loop.shutdown(),
            )),
        },
        Err(e) => {
            let mut render_loop = render_loop;
            Err((e, render_loop.shutdown()))
        }
    }
}

impl<B: TerminalBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::backend::headless::HeadlessEvents;
    use crate::backend::{HeadlessBackend, HeadlessController};
    use crate::error::BackendError;
    use crossbeam_channel::RecvTimeoutError;
    use crossterm::event::{Event, KeyCode, KeyEvent};
    use image::{Rgba, RgbaImage};

    const WAIT: Duration = Duration::from_secs(2);

    fn image(pattern: &[&[u8]]) -> DynamicImage {
        let h = pattern.len() as u32;
        let w = pattern[0].len() as u32;
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([0, 0, 0, pattern[y as usize][x as usize]])
        }))
    }

    fn engine(w: u16, h: u16) -> (Engine<HeadlessBackend>, HeadlessController) {
        let (backend, ctl) = HeadlessBackend::new(w, h);
        (Engine::new(backend), ctl)
    }

    fn wait_for(ctl: &HeadlessController, mut done: impl FnMut(&HeadlessController) -> bool) {
        let deadline = Instant::now() + WAIT;
        while !done(ctl) {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::from(KeyCode::Char(c)))
    }

    /// Headless backend whose viewport query panics, taking the render
    /// thread down on its first draw
    struct FragileBackend(HeadlessBackend);

    impl TerminalBackend for FragileBackend {
        type Events = HeadlessEvents;

        fn init(&mut self) -> std::result::Result<(), BackendError> {
            self.0.init()
        }
        fn set_input_mode(&mut self, mode: InputMode) -> std::result::Result<(), BackendError> {
            self.0.set_input_mode(mode)
        }
        fn events(&self) -> HeadlessEvents {
            self.0.events()
        }
        fn size(&self) -> std::result::Result<(u16, u16), BackendError> {
            panic!("viewport query failed")
        }
        fn clear(&mut self) -> std::result::Result<(), BackendError> {
            self.0.clear()
        }
        fn set_cell(&mut self, x: u16, y: u16, glyph: char) -> std::result::Result<(), BackendError> {
            self.0.set_cell(x, y, glyph)
        }
        fn flush(&mut self) -> std::result::Result<(), BackendError> {
            self.0.flush()
        }
        fn sync(&mut self) -> std::result::Result<(), BackendError> {
            self.0.sync()
        }
        fn close(&mut self) -> std::result::Result<(), BackendError> {
            self.0.close()
        }
    }

    #[test]
    fn test_not_running() {
        let (mut engine, _ctl) = engine(2, 2);
        let ms = Duration::from_millis(10);
        assert!(matches!(
            engine.submit_animation(&[image(&[&[255]])], '*', ms),
            Err(EngineError::NotRunning)
        ));
        assert!(matches!(engine.input_events(), Err(EngineError::NotRunning)));

        engine.start().unwrap();
        engine.stop();
        assert!(matches!(
            engine.submit(AnimationSpec::blank()),
            Err(EngineError::NotRunning)
        ));
    }

    #[test]
    fn test_start_failure_leaves_engine_unstarted() {
        let (backend, _ctl) = HeadlessBackend::new(2, 2);
        let mut engine = Engine::new(backend.refuse_init());

        assert!(matches!(engine.start(), Err(EngineError::Backend(_))));
        assert!(!engine.is_running());
        // Backend is kept, so a later attempt reports the same failure
        assert!(matches!(engine.start(), Err(EngineError::Backend(_))));
    }

    #[test]
    fn test_double_start() {
        let (mut engine, ctl) = engine(2, 2);
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(EngineError::AlreadyRunning)));
        assert_eq!(ctl.snapshot().input_mode, Some(InputMode::Esc));
    }

    #[test]
    fn test_diagonal_animation() {
        let (mut engine, ctl) = engine(4, 3);
        engine.start().unwrap();
        engine
            .submit_animation(
                &[image(&[&[0, 255], &[255, 0]])],
                '*',
                Duration::from_millis(100),
            )
            .unwrap();

        wait_for(&ctl, |c| c.snapshot().flushes >= 1);
        assert_eq!(ctl.flushed()[0], " *  \n*   \n    ");
    }

    #[test]
    fn test_alternating_animation() {
        let (mut engine, ctl) = engine(1, 1);
        engine.start().unwrap();
        engine
            .submit_animation(
                &[image(&[&[255]]), image(&[&[0]])],
                '*',
                Duration::from_millis(5),
            )
            .unwrap();

        wait_for(&ctl, |c| c.snapshot().flushes >= 4);
        assert_eq!(&ctl.flushed()[..4], &["*", " ", "*", " "]);
    }

    #[test]
    fn test_invalid_glyph() {
        let (mut engine, _ctl) = engine(1, 1);
        engine.start().unwrap();
        assert!(matches!(
            engine.submit_animation(&[image(&[&[255]])], '\t', Duration::from_millis(5)),
            Err(EngineError::Spec(_))
        ));
    }

    #[test]
    fn test_blank_stops_drawing() {
        let (mut engine, ctl) = engine(1, 1);
        engine.start().unwrap();
        engine
            .submit_animation(&[image(&[&[255]])], '#', Duration::from_millis(5))
            .unwrap();
        wait_for(&ctl, |c| c.snapshot().flushes >= 2);

        engine.submit(AnimationSpec::blank()).unwrap();
        // Rendezvous with the loop guarantees the blank has been applied
        engine.set_display_enabled(true);
        let writes = ctl.snapshot().cell_writes;
        thread::sleep(Duration::from_millis(40));

        let screen = ctl.snapshot();
        assert_eq!(screen.cell_writes, writes);
        assert_eq!(screen.cell(0, 0), None);
    }

    #[test]
    fn test_headless_display() {
        let (mut engine, ctl) = engine(2, 2);
        engine.set_display_enabled(false);
        engine.start().unwrap();
        engine
            .submit_animation(&[image(&[&[255]])], '*', Duration::from_millis(5))
            .unwrap();
        thread::sleep(Duration::from_millis(40));
        assert_eq!(ctl.snapshot().cell_writes, 0);

        engine.set_display_enabled(true);
        wait_for(&ctl, |c| c.snapshot().cell_writes >= 1);
    }

    #[test]
    fn test_input_events() {
        let (mut engine, ctl) = engine(1, 1);
        engine.start().unwrap();
        let events = engine.input_events().unwrap();

        ctl.send_event(key('x'));
        assert_eq!(events.recv_timeout(WAIT).unwrap(), key('x'));

        engine.stop();
        ctl.send_event(key('y'));
        loop {
            match events.recv_timeout(WAIT) {
                Ok(event) => assert_eq!(event, key('y')),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => panic!("event stream did not close"),
            }
        }
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut engine, ctl) = engine(1, 1);
        engine.start().unwrap();
        engine.stop();
        engine.stop();
        engine.wait_stopped().unwrap();
        engine.stop();
        engine.wait_stopped().unwrap();

        let screen = ctl.snapshot();
        assert_eq!(screen.closes, 1);
        assert!(!screen.initialized);
    }

    #[test]
    fn test_wait_stopped_requires_stop() {
        let (mut engine, _ctl) = engine(1, 1);
        engine.start().unwrap();
        assert!(matches!(engine.wait_stopped(), Err(EngineError::AlreadyRunning)));
    }

    #[test]
    fn test_new_interval_replaces_timer() {
        let (mut engine, ctl) = engine(1, 1);
        engine.start().unwrap();
        engine
            .submit_animation(&[image(&[&[255]])], '*', Duration::from_millis(5))
            .unwrap();
        wait_for(&ctl, |c| c.snapshot().flushes >= 3);

        engine
            .submit_animation(&[image(&[&[255]])], '*', Duration::from_secs(10))
            .unwrap();
        // Rendezvous: the swap has been applied once this returns
        engine.set_display_enabled(true);
        let before = ctl.snapshot().flushes;
        thread::sleep(Duration::from_millis(200));

        // The 5ms timer is gone and the 10s one has not fired yet
        assert_eq!(ctl.snapshot().flushes, before);
    }

    #[test]
    fn test_display_toggle_not_recorded_when_undelivered() {
        let (backend, ctl) = HeadlessBackend::new(1, 1);
        let mut engine = Engine::new(FragileBackend(backend));
        engine.start().unwrap();
        engine
            .submit_animation(&[image(&[&[255]])], '*', Duration::from_millis(5))
            .unwrap();

        // First tick kills the render thread; unwinding closes the session
        wait_for(&ctl, |c| c.snapshot().closes == 1);

        engine.set_display_enabled(false);
        assert!(engine.display_enabled());
    }

    #[test]
    fn test_failed_render_spawn_returns_backend() {
        let (mut backend, ctl) = HeadlessBackend::new(1, 1);
        backend.init().unwrap();
        let render_loop = RenderLoop::new(TerminalSession::new(backend), true);
        let (_cmd_tx, cmd_rx) = bounded(0);
        let (_stop_tx, stop_rx) = bounded(1);

        let result = spawn_render(render_loop, cmd_rx, stop_rx, |_| {
            Err(io::Error::new(io::ErrorKind::Other, "out of threads"))
        });
        match result {
            Err((_, backend)) => assert!(backend.is_some()),
            Ok(_) => panic!("spawn should have failed"),
        }
        assert_eq!(ctl.snapshot().closes, 1);
    }

    #[test]
    fn test_restart() {
        let (mut engine, ctl) = engine(1, 1);
        engine.start().unwrap();
        engine.stop();
        engine.start().unwrap();
        assert_eq!(ctl.snapshot().closes, 1);

        engine
            .submit_animation(&[image(&[&[255]])], '*', Duration::from_millis(5))
            .unwrap();
        wait_for(&ctl, |c| c.flushed().iter().any(|f| f == "*"));

        engine.stop();
        engine.wait_stopped().unwrap();
        assert_eq!(ctl.snapshot().closes, 2);
    }
}
