/*!
# Window Capture

Window-capture sample source.

Opens a window and pushes one sample per `CursorMoved` event until the
observation window closes. The event loop owns the main thread; the
session runs on the shared runtime.
*/

use std::time::{Duration, Instant};

use mouse_botcheck::{Sample, SampleSink, SessionOutcome};
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::{Session, runtime};

const DETACH_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct CaptureApp {
    sink: SampleSink,
    window: Option<Window>,
}

impl ApplicationHandler<()> for CaptureApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes().with_title("Mouse Botcheck - move the pointer");
        match event_loop.create_window(attributes) {
            Ok(window) => self.window = Some(window),
            Err(e) => {
                error!("Failed to create capture window: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                if self.sink.push(Sample::now(position.x, position.y)).is_err() {
                    event_loop.exit();
                }
            }
            WindowEvent::CloseRequested => {
                info!("Capture window closed; waiting for the observation window to end");
                event_loop.exit();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.sink.is_detached() {
            event_loop.exit();
        } else {
            event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + DETACH_POLL_INTERVAL));
        }
    }
}

/// Runs `session` with the window as its only sample source.
pub fn run(mut session: Session) -> anyhow::Result<SessionOutcome> {
    let runtime = runtime()?;
    let sink = session.start()?;
    let handle = runtime.spawn(async move { session.run().await });

    let event_loop = EventLoop::new()?;
    let mut app = CaptureApp { sink, window: None };
    event_loop.run_app(&mut app)?;
    drop(app);

    Ok(runtime.block_on(handle)??)
}
