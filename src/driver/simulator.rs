use super::{check_frames, DriverError, PanelCapability, PanelDriver};
use crate::render::Frame;
use embedded_graphics::{
    pixelcolor::{BinaryColor, Rgb888},
    prelude::{DrawTarget, Point, RgbColor, Size},
    Pixel,
};
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
};
use log::{debug, error};
use parking_lot::Mutex;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 384;

const ACCENT: Rgb888 = Rgb888::new(200, 30, 30);

/// Shows every refresh in a desktop window.
pub struct SimulatorPanel {
    capability: PanelCapability,

    /// Latest frame, picked up by the window thread
    frame: Arc<Mutex<Option<SimulatorDisplay<Rgb888>>>>,

    /// Flag used to gracefully terminate the window thread
    alive: Arc<AtomicBool>,

    /// Handle to the window thread
    window_thread_handle: Option<thread::JoinHandle<()>>,
}

impl SimulatorPanel {
    pub fn new(capability: PanelCapability) -> Self {
        let alive = Arc::new(AtomicBool::new(true));
        let frame = Arc::new(Mutex::new(None));

        let alive_window = alive.clone();
        let window_frame = frame.clone();

        let window_thread_handle = thread::spawn(move || {
            let output_settings = OutputSettingsBuilder::new().scale(1).max_fps(10).build();
            let mut window = Window::new("rustic-ink-display", &output_settings);
            let mut canvas = SimulatorDisplay::<Rgb888>::new(Size::new(WIDTH, HEIGHT));

            debug!("Started simulator window thread");
            while alive_window.load(Ordering::SeqCst) {
                if let Some(latest) = window_frame.lock().take() {
                    canvas = latest;
                }

                window.update(&canvas);
                if window.events().any(|event| matches!(event, SimulatorEvent::Quit)) {
                    break;
                }

                thread::sleep(Duration::from_millis(100));
            }
        });

        Self {
            capability,
            frame,
            alive,
            window_thread_handle: Some(window_thread_handle),
        }
    }
}

impl PanelDriver for SimulatorPanel {
    fn capability(&self) -> PanelCapability {
        self.capability
    }

    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }

    fn init(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn send(&mut self, black: &Frame, accent: Option<&Frame>) -> Result<(), DriverError> {
        check_frames(self.capability, self.size(), black, accent)?;

        let mut display = SimulatorDisplay::<Rgb888>::new(self.size());
        let pixels = black.rows().enumerate().flat_map(|(y, row)| {
            row.iter().enumerate().map(move |(x, color)| {
                let point = Point::new(x as i32, y as i32);
                let accent = accent.and_then(|accent| accent.pixel(point));

                let color = match (color, accent) {
                    (_, Some(BinaryColor::On)) => ACCENT,
                    (BinaryColor::On, _) => Rgb888::BLACK,
                    (BinaryColor::Off, _) => Rgb888::WHITE,
                };
                Pixel(point, color)
            })
        });

        display
            .draw_iter(pixels)
            .map_err(|e| DriverError::Output(format!("{e:?}")))?;
        *self.frame.lock() = Some(display);

        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

impl Drop for SimulatorPanel {
    fn drop(&mut self) {
        let Self {
            alive,
            window_thread_handle,
            ..
        } = self;

        // Stop the window thread
        alive.store(false, Ordering::SeqCst);

        if let Some(handle) = window_thread_handle.take() {
            if handle.join().is_err() {
                error!("Simulator window thread panicked");
            }
        }
    }
}
