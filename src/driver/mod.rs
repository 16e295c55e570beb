use crate::render::Frame;
use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::{OriginDimensions, Size},
};
use log::{debug, error, info};
use std::error::Error;

pub mod bus;
pub mod epd7in5;
pub mod image_file;
pub mod registry;

#[cfg(feature = "simulator")]
pub mod simulator;

/// Number of colours a panel can show besides paper white.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelCapability {
    /// Black and white
    TwoColour,

    /// Black, white and one accent colour, usually red or yellow
    ThreeColour,
}

/// A physical (or pretend) e-paper panel.
///
/// Frames handed to [`PanelDriver::send`] are always in the native orientation
/// and resolution of the panel.
pub trait PanelDriver: Send {
    fn capability(&self) -> PanelCapability;

    /// Native resolution, landscape for the SPI panels
    fn size(&self) -> Size;

    /// Wakes the panel. Must be safe to call after [`PanelDriver::sleep`].
    fn init(&mut self) -> Result<(), DriverError>;

    /// Transfers the frames and refreshes the panel.
    ///
    /// Three colour panels need `accent` and fail with
    /// [`DriverError::MissingAccent`] without touching the bus when it is missing.
    fn send(&mut self, black: &Frame, accent: Option<&Frame>) -> Result<(), DriverError>;

    /// Powers the panel down.
    fn sleep(&mut self) -> Result<(), DriverError>;
}

#[derive(Debug)]
pub enum DriverError {
    MissingAccent,
    FrameSize { expected: Size, actual: Size },
    Bus(String),
    BusyTimeout,
    Output(String),
    Unavailable(&'static str),
}

impl Error for DriverError {}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAccent => write!(f, "Three colour panel needs an accent canvas"),
            Self::FrameSize { expected, actual } => write!(
                f,
                "Frame of {}x{} does not fit the {}x{} panel",
                actual.width, actual.height, expected.width, expected.height
            ),
            Self::Bus(reason) => write!(f, "Panel bus error: {}", reason),
            Self::BusyTimeout => write!(f, "Panel stayed busy for too long"),
            Self::Output(reason) => write!(f, "Could not write panel output: {}", reason),
            Self::Unavailable(feature) => write!(
                f,
                "Panel support was not compiled in, enable the \"{}\" feature",
                feature
            ),
        }
    }
}

pub(crate) fn check_frames(
    capability: PanelCapability,
    size: Size,
    black: &Frame,
    accent: Option<&Frame>,
) -> Result<(), DriverError> {
    if capability == PanelCapability::ThreeColour && accent.is_none() {
        return Err(DriverError::MissingAccent);
    }

    for frame in std::iter::once(black).chain(accent) {
        if frame.size() != size {
            return Err(DriverError::FrameSize {
                expected: size,
                actual: frame.size(),
            });
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Uninitialized,
    Awake,
    Sent,
    Asleep,
}

/// Owns the panel and tracks its power state.
pub struct Display {
    panel: Box<dyn PanelDriver>,
    state: PanelState,

    /// Turn the image upside down before sending
    flipped: bool,
}

impl Display {
    pub fn new(panel: Box<dyn PanelDriver>, flipped: bool) -> Self {
        Self {
            panel,
            state: PanelState::Uninitialized,
            flipped,
        }
    }

    pub fn capability(&self) -> PanelCapability {
        self.panel.capability()
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    /// Wakes the panel for one cycle.
    ///
    /// The panel goes back to sleep when the returned guard is dropped, no matter
    /// how the cycle ends.
    pub fn wake(&mut self) -> Result<AwakePanel<'_>, DriverError> {
        if let Err(e) = self.panel.init() {
            if let Err(sleep_error) = self.panel.sleep() {
                error!("Could not put the panel to sleep: {sleep_error}");
            }
            self.state = PanelState::Asleep;
            return Err(e);
        }

        debug!("Panel awake");
        self.state = PanelState::Awake;

        Ok(AwakePanel { display: self })
    }
}

/// A panel that is powered up. Dropping the guard puts the panel to sleep.
pub struct AwakePanel<'a> {
    display: &'a mut Display,
}

impl AwakePanel<'_> {
    /// Sends canvases in the layout the dashboard was composed in.
    ///
    /// Portrait canvases are turned clockwise to fit a landscape panel.
    pub fn send(&mut self, black: &Frame, accent: Option<&Frame>) -> Result<(), DriverError> {
        let Display {
            panel,
            state,
            flipped,
        } = &mut *self.display;

        let capability = panel.capability();
        if capability == PanelCapability::ThreeColour && accent.is_none() {
            return Err(DriverError::MissingAccent);
        }

        let native = panel.size();
        let black = orient(black, native, *flipped)?;
        let accent = match capability {
            PanelCapability::ThreeColour => accent
                .map(|accent| orient(accent, native, *flipped))
                .transpose()?,
            PanelCapability::TwoColour => None,
        };

        panel.send(&black, accent.as_ref())?;
        *state = PanelState::Sent;

        Ok(())
    }

    /// Flushes the panel with solid colours to remove ghosting.
    pub fn calibrate(&mut self, cycles: u32) -> Result<(), DriverError> {
        let panel = &mut self.display.panel;
        let size = panel.size();

        let paper = Frame::new(size);
        let ink = Frame::filled(size, BinaryColor::On);

        for cycle in 1..=cycles {
            info!("Calibration cycle {} of {}", cycle, cycles);

            match panel.capability() {
                PanelCapability::TwoColour => {
                    panel.send(&ink, None)?;
                    panel.send(&paper, None)?;
                }
                PanelCapability::ThreeColour => {
                    panel.send(&ink, Some(&paper))?;
                    panel.send(&paper, Some(&ink))?;
                    panel.send(&paper, Some(&paper))?;
                }
            }
        }

        self.display.state = PanelState::Sent;
        Ok(())
    }
}

impl Drop for AwakePanel<'_> {
    fn drop(&mut self) {
        match self.display.panel.sleep() {
            Ok(()) => debug!("Panel asleep"),
            Err(e) => error!("Could not put the panel to sleep: {e}"),
        }

        self.display.state = PanelState::Asleep;
    }
}

/// Rotates `frame` into the native orientation of a panel of `native` size.
fn orient(frame: &Frame, native: Size, flipped: bool) -> Result<Frame, DriverError> {
    let size = frame.size();

    let oriented = if size == native {
        frame.clone()
    } else if Size::new(size.height, size.width) == native {
        frame.rotate_cw()
    } else {
        return Err(DriverError::FrameSize {
            expected: native,
            actual: size,
        });
    };

    Ok(if flipped {
        oriented.rotate_180()
    } else {
        oriented
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::Point;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Calls {
        log: Vec<String>,
        frames: Vec<Frame>,
    }

    struct RecordingPanel {
        capability: PanelCapability,
        fail_send: bool,
        calls: Arc<Mutex<Calls>>,
    }

    impl PanelDriver for RecordingPanel {
        fn capability(&self) -> PanelCapability {
            self.capability
        }

        fn size(&self) -> Size {
            Size::new(4, 2)
        }

        fn init(&mut self) -> Result<(), DriverError> {
            self.calls.lock().log.push("init".to_owned());
            Ok(())
        }

        fn send(&mut self, black: &Frame, accent: Option<&Frame>) -> Result<(), DriverError> {
            check_frames(self.capability, self.size(), black, accent)?;

            let mut calls = self.calls.lock();
            calls.log.push("send".to_owned());
            calls.frames.push(black.clone());

            if self.fail_send {
                return Err(DriverError::Bus("SPI transfer failed".to_owned()));
            }
            Ok(())
        }

        fn sleep(&mut self) -> Result<(), DriverError> {
            self.calls.lock().log.push("sleep".to_owned());
            Ok(())
        }
    }

    fn display(capability: PanelCapability, fail_send: bool) -> (Display, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let panel = RecordingPanel {
            capability,
            fail_send,
            calls: calls.clone(),
        };

        (Display::new(Box::new(panel), false), calls)
    }

    #[test]
    fn states_follow_the_cycle() {
        let (mut display, calls) = display(PanelCapability::TwoColour, false);
        assert_eq!(display.state(), PanelState::Uninitialized);

        {
            let mut panel = display.wake().unwrap();
            panel.send(&Frame::new(Size::new(4, 2)), None).unwrap();
            assert_eq!(panel.display.state, PanelState::Sent);
        }

        assert_eq!(display.state(), PanelState::Asleep);
        assert_eq!(calls.lock().log, vec!["init", "send", "sleep"]);
    }

    #[test]
    fn failed_send_still_sleeps_exactly_once() {
        let (mut display, calls) = display(PanelCapability::TwoColour, true);

        let result = display
            .wake()
            .and_then(|mut panel| panel.send(&Frame::new(Size::new(4, 2)), None));

        assert!(matches!(result, Err(DriverError::Bus(_))));
        assert_eq!(display.state(), PanelState::Asleep);
        assert_eq!(
            calls.lock().log.iter().filter(|call| *call == "sleep").count(),
            1
        );
    }

    #[test]
    fn three_colour_send_without_accent_fails_fast() {
        let (mut display, calls) = display(PanelCapability::ThreeColour, false);

        let result = display
            .wake()
            .and_then(|mut panel| panel.send(&Frame::new(Size::new(4, 2)), None));

        assert!(matches!(result, Err(DriverError::MissingAccent)));
        assert_eq!(calls.lock().log, vec!["init", "sleep"]);
    }

    #[test]
    fn portrait_canvas_is_rotated_to_the_panel() {
        let (mut display, calls) = display(PanelCapability::TwoColour, false);
        let mut portrait = Frame::new(Size::new(2, 4));
        portrait.set_pixel(Point::new(0, 0), BinaryColor::On);

        display
            .wake()
            .and_then(|mut panel| panel.send(&portrait, None))
            .unwrap();

        let sent = &calls.lock().frames[0];
        assert_eq!(sent.size(), Size::new(4, 2));
        assert_eq!(sent.pixel(Point::new(3, 0)), Some(BinaryColor::On));
    }

    #[test]
    fn canvas_of_wrong_size_is_rejected() {
        let (mut display, _) = display(PanelCapability::TwoColour, false);

        let result = display
            .wake()
            .and_then(|mut panel| panel.send(&Frame::new(Size::new(3, 3)), None));

        assert!(matches!(result, Err(DriverError::FrameSize { .. })));
    }

    #[test]
    fn calibration_flushes_every_colour() {
        let (mut display, calls) = display(PanelCapability::ThreeColour, false);

        display
            .wake()
            .and_then(|mut panel| panel.calibrate(2))
            .unwrap();

        assert_eq!(
            calls.lock().log.iter().filter(|call| *call == "send").count(),
            6
        );
    }
}
