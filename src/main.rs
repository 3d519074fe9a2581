mod config;
mod error;
mod geometry;
mod input;
mod logging;
mod outcome;
mod renderer;
mod roster;
mod scene;
mod session;
mod stimulus;
mod tasks;
mod timer;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use crate::config::{ParameterStore, SessionConfig};
use crate::geometry::RectPx;
use crate::input::{AnalogInput, KeyboardAxes};
use crate::logging::TrialLog;
use crate::outcome::{LoggingCues, OutcomeResolver, StepperDispenser};
use crate::renderer::SceneRenderer;
use crate::roster::Roster;
use crate::session::{SessionState, SessionStatus};
use crate::stimulus::StimulusLibrary;
use crate::timer::TickClock;

const ROSTER_FILE: &str = "AnimalIDs.txt";
const PARAMETERS_FILE: &str = "parameters.txt";
const STIMULI_DIR: &str = "stimuli";
const RESULTS_DIR: &str = "results";

type SessionSink = BufWriter<File>;

/// Everything loaded before the window exists. The session itself is built
/// once the display size is known.
struct Prepared {
    config: SessionConfig,
    library: StimulusLibrary,
    resolver: OutcomeResolver<SessionSink>,
    summary_path: PathBuf,
}

struct App {
    prepared: Option<Prepared>,
    session: Option<SessionState<SessionSink>>,
    summary_path: Option<PathBuf>,
    input: Option<KeyboardAxes>,
    clock: TickClock,

    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SceneRenderer>,

    should_exit: bool,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(subject_arg: Option<&str>) -> Result<Self> {
        let roster = Roster::load(Path::new(ROSTER_FILE))?;
        let subject = roster.select(subject_arg)?.to_owned();

        let store = ParameterStore::load(Path::new(PARAMETERS_FILE))?;
        let config = SessionConfig::from_store(&store)?;
        let library = StimulusLibrary::scan(Path::new(STIMULI_DIR))?;

        let results_dir = Path::new(RESULTS_DIR);
        let log = TrialLog::for_subject(results_dir, &subject)?;
        let resolver = OutcomeResolver::new(
            log,
            Box::new(LoggingCues),
            Box::new(StepperDispenser::new()),
        );

        info!(
            subject = %subject,
            tasks = config.active_tasks().len(),
            "session prepared"
        );

        Ok(Self {
            prepared: Some(Prepared {
                config,
                library,
                resolver,
                summary_path: logging::summary_path(results_dir, &subject),
            }),
            session: None,
            summary_path: None,
            input: None,
            clock: TickClock::new(),
            window: None,
            pixels: None,
            renderer: None,
            should_exit: false,
            failure: None,
        })
    }

    fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self)?;
        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next());

        let attributes = Window::default_attributes()
            .with_title("Cognitive Battery")
            .with_fullscreen(Some(Fullscreen::Borderless(monitor)))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(width = size.width, height = size.height, "display configured");

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);
        self.renderer = Some(SceneRenderer::new(size.width, size.height)?);
        self.input = Some(KeyboardAxes::open(true)?);

        let prepared = self
            .prepared
            .take()
            .context("session already constructed")?;
        let screen = RectPx::new(0.0, 0.0, size.width as f32, size.height as f32);
        self.session = Some(SessionState::new(
            prepared.config,
            screen,
            prepared.library,
            prepared.resolver,
            StdRng::from_os_rng(),
        )?);
        self.summary_path = Some(prepared.summary_path);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// One tick: sample input, advance the engine, paint, pace.
    fn frame(&mut self) -> Result<()> {
        let (session, input, pixels, renderer) = match (
            self.session.as_mut(),
            self.input.as_mut(),
            self.pixels.as_mut(),
            self.renderer.as_mut(),
        ) {
            (Some(s), Some(i), Some(p), Some(r)) => (s, i, p, r),
            _ => return Ok(()),
        };

        let sample = input.sample();
        let status = session.tick(sample)?;

        let scene = session.scene();
        renderer.render(&scene, session.library(), pixels.frame_mut())?;
        pixels.render()?;

        self.clock.pace();

        if status == SessionStatus::Finished {
            self.finish()?;
        }
        Ok(())
    }

    /// Normal completion: summary plus a flushed result log, then exit 0.
    fn finish(&mut self) -> Result<()> {
        if let Some(session) = self.session.as_mut() {
            if let Some(path) = &self.summary_path {
                session.resolver().write_summary(path)?;
            }
            session.resolver_mut().flush()?;
        }
        info!(
            avg_frame_ms = self.clock.average_frame_ms(),
            "session complete"
        );
        self.should_exit = true;
        Ok(())
    }

    /// Operator stop: the live trial is abandoned without a log record, but
    /// already-resolved trials stay on disk.
    fn abandon(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Err(err) = session.resolver_mut().flush() {
                error!(%err, "result log flush failed on exit");
            }
        }
        info!("session stopped by operator");
        self.should_exit = true;
    }

    fn handle_key(&mut self, key: PhysicalKey, held: bool) {
        let Some(input) = self.input.as_mut() else {
            return;
        };
        if let PhysicalKey::Code(code) = key {
            match code {
                KeyCode::ArrowLeft => input.set_left(held),
                KeyCode::ArrowRight => input.set_right(held),
                KeyCode::ArrowUp => input.set_up(held),
                KeyCode::ArrowDown => input.set_down(held),
                KeyCode::Escape if held => self.abandon(),
                _ => {}
            }
        }
    }

    fn fail(&mut self, err: anyhow::Error, event_loop: &ActiveEventLoop) {
        error!(%err, "fatal error");
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.create_window_and_surface(event_loop) {
                self.fail(err, event_loop);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.abandon(),
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.frame() {
                    self.fail(err, event_loop);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event.physical_key, event.state.is_pressed());
            }
            WindowEvent::Resized(size) => {
                if let Some(pixels) = self.pixels.as_mut() {
                    let _ = pixels.resize_surface(size.width, size.height);
                    let _ = pixels.resize_buffer(size.width, size.height);
                }
                if let Some(renderer) = self.renderer.as_mut() {
                    if let Err(err) = renderer.resize(size.width, size.height) {
                        self.fail(err.into(), event_loop);
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            if let Some(window) = &self.window {
                window.set_cursor_visible(true);
            }
            event_loop.exit();
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let subject = std::env::args().nth(1);
    let app = App::new(subject.as_deref())?;
    app.run()
}
