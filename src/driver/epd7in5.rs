//! Waveshare 7.5" 640x384 panels, black and white or with a red/yellow accent.

use super::{bus::PanelBus, check_frames, DriverError, PanelCapability, PanelDriver};
use crate::render::Frame;
use embedded_graphics::{pixelcolor::BinaryColor, prelude::Size};
use log::debug;

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 384;

const PANEL_SETTING: u8 = 0x00;
const POWER_SETTING: u8 = 0x01;
const POWER_OFF: u8 = 0x02;
const POWER_ON: u8 = 0x04;
const BOOSTER_SOFT_START: u8 = 0x06;
const DEEP_SLEEP: u8 = 0x07;
const DATA_START_TRANSMISSION_1: u8 = 0x10;
const DISPLAY_REFRESH: u8 = 0x12;
const PLL_CONTROL: u8 = 0x30;
const TEMPERATURE_CALIBRATION: u8 = 0x41;
const VCOM_AND_DATA_INTERVAL_SETTING: u8 = 0x50;
const TCON_SETTING: u8 = 0x60;
const TCON_RESOLUTION: u8 = 0x61;
const VCM_DC_SETTING: u8 = 0x82;
const FLASH_MODE: u8 = 0xE5;

const DEEP_SLEEP_CHECK: u8 = 0xA5;

// Four bits per pixel
const BLACK: u8 = 0x0;
const WHITE: u8 = 0x3;
const ACCENT: u8 = 0x4;

pub struct Epd7in5<B> {
    bus: B,
    capability: PanelCapability,
}

impl<B: PanelBus> Epd7in5<B> {
    pub fn new(bus: B, capability: PanelCapability) -> Self {
        Self { bus, capability }
    }

    /// Consumes the driver, handing back the bus.
    pub fn into_bus(self) -> B {
        self.bus
    }
}

/// Packs two pixels per byte, the left pixel in the high nibble. Accent ink wins
/// over black ink.
pub fn encode(black: &Frame, accent: Option<&Frame>) -> Vec<u8> {
    let pixel_value = |black: BinaryColor, accent: Option<BinaryColor>| match (black, accent) {
        (_, Some(BinaryColor::On)) => ACCENT,
        (BinaryColor::On, _) => BLACK,
        (BinaryColor::Off, _) => WHITE,
    };

    let mut accent_rows = accent.map(|accent| accent.rows());
    let mut buffer = Vec::with_capacity((WIDTH * HEIGHT / 2) as usize);

    for black_row in black.rows() {
        let accent_row = accent_rows.as_mut().and_then(|rows| rows.next());

        let values = black_row.iter().enumerate().map(|(x, black)| {
            pixel_value(*black, accent_row.and_then(|row| row.get(x).copied()))
        });

        let values = values.collect::<Vec<_>>();
        buffer.extend(values.chunks(2).map(|pair| {
            let high = pair[0];
            let low = pair.get(1).copied().unwrap_or(WHITE);
            (high << 4) | low
        }));
    }

    buffer
}

impl<B: PanelBus> PanelDriver for Epd7in5<B> {
    fn capability(&self) -> PanelCapability {
        self.capability
    }

    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }

    fn init(&mut self) -> Result<(), DriverError> {
        let bus = &mut self.bus;

        bus.reset()?;
        bus.command_with_data(POWER_SETTING, &[0x37, 0x00])?;
        bus.command_with_data(PANEL_SETTING, &[0xCF, 0x08])?;
        bus.command_with_data(BOOSTER_SOFT_START, &[0xC7, 0xCC, 0x28])?;
        bus.command(POWER_ON)?;
        bus.wait_until_idle()?;
        bus.command_with_data(PLL_CONTROL, &[0x3C])?;
        bus.command_with_data(TEMPERATURE_CALIBRATION, &[0x00])?;
        bus.command_with_data(VCOM_AND_DATA_INTERVAL_SETTING, &[0x77])?;
        bus.command_with_data(TCON_SETTING, &[0x22])?;
        // Source 640, gate 384
        bus.command_with_data(TCON_RESOLUTION, &[0x02, 0x80, 0x01, 0x80])?;
        bus.command_with_data(VCM_DC_SETTING, &[0x1E])?;
        bus.command_with_data(FLASH_MODE, &[0x03])?;

        debug!("Initialized 7.5\" panel");
        Ok(())
    }

    fn send(&mut self, black: &Frame, accent: Option<&Frame>) -> Result<(), DriverError> {
        check_frames(self.capability, self.size(), black, accent)?;

        let accent = match self.capability {
            PanelCapability::ThreeColour => accent,
            PanelCapability::TwoColour => None,
        };
        let buffer = encode(black, accent);

        let bus = &mut self.bus;
        bus.command_with_data(DATA_START_TRANSMISSION_1, &buffer)?;
        bus.command(DISPLAY_REFRESH)?;
        bus.delay_ms(100);
        bus.wait_until_idle()?;

        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DriverError> {
        let bus = &mut self.bus;

        bus.command(POWER_OFF)?;
        bus.wait_until_idle()?;
        bus.command_with_data(DEEP_SLEEP, &[DEEP_SLEEP_CHECK])?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::Point;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Transfer {
        Reset,
        Command(u8),
        Data(usize),
        Wait,
    }

    #[derive(Default)]
    struct MockBus {
        transfers: Vec<Transfer>,
        fail_data: bool,
    }

    impl PanelBus for MockBus {
        fn reset(&mut self) -> Result<(), DriverError> {
            self.transfers.push(Transfer::Reset);
            Ok(())
        }

        fn command(&mut self, command: u8) -> Result<(), DriverError> {
            self.transfers.push(Transfer::Command(command));
            Ok(())
        }

        fn data(&mut self, data: &[u8]) -> Result<(), DriverError> {
            if self.fail_data {
                return Err(DriverError::Bus("write failed".to_owned()));
            }
            self.transfers.push(Transfer::Data(data.len()));
            Ok(())
        }

        fn delay_ms(&mut self, _ms: u64) {}

        fn wait_until_idle(&mut self) -> Result<(), DriverError> {
            self.transfers.push(Transfer::Wait);
            Ok(())
        }
    }

    fn frame() -> Frame {
        Frame::new(Size::new(WIDTH, HEIGHT))
    }

    #[test]
    fn pixels_pack_into_nibbles() {
        let mut black = Frame::new(Size::new(4, 1));
        black.set_pixel(Point::new(0, 0), BinaryColor::On);
        black.set_pixel(Point::new(3, 0), BinaryColor::On);
        let mut accent = Frame::new(Size::new(4, 1));
        accent.set_pixel(Point::new(3, 0), BinaryColor::On);

        assert_eq!(encode(&black, None), vec![0x03, 0x30]);
        assert_eq!(encode(&black, Some(&accent)), vec![0x03, 0x34]);
    }

    #[test]
    fn frame_is_sent_then_refreshed() {
        let mut panel = Epd7in5::new(MockBus::default(), PanelCapability::TwoColour);

        panel.send(&frame(), None).unwrap();

        assert_eq!(
            panel.into_bus().transfers,
            vec![
                Transfer::Command(DATA_START_TRANSMISSION_1),
                Transfer::Data((WIDTH * HEIGHT / 2) as usize),
                Transfer::Command(DISPLAY_REFRESH),
                Transfer::Wait,
            ]
        );
    }

    #[test]
    fn missing_accent_leaves_the_bus_untouched() {
        let mut panel = Epd7in5::new(MockBus::default(), PanelCapability::ThreeColour);

        let result = panel.send(&frame(), None);

        assert!(matches!(result, Err(DriverError::MissingAccent)));
        assert!(panel.into_bus().transfers.is_empty());
    }

    #[test]
    fn sleep_powers_off_then_deep_sleeps() {
        let mut panel = Epd7in5::new(MockBus::default(), PanelCapability::TwoColour);

        panel.sleep().unwrap();

        assert_eq!(
            panel.into_bus().transfers,
            vec![
                Transfer::Command(POWER_OFF),
                Transfer::Wait,
                Transfer::Command(DEEP_SLEEP),
                Transfer::Data(1),
            ]
        );
    }

    #[test]
    fn io_failure_is_reported() {
        let bus = MockBus {
            fail_data: true,
            ..MockBus::default()
        };
        let mut panel = Epd7in5::new(bus, PanelCapability::TwoColour);

        assert!(matches!(panel.send(&frame(), None), Err(DriverError::Bus(_))));
    }

    #[test]
    fn init_starts_with_a_reset() {
        let mut panel = Epd7in5::new(MockBus::default(), PanelCapability::TwoColour);

        panel.init().unwrap();

        let transfers = panel.into_bus().transfers;
        assert_eq!(transfers[0], Transfer::Reset);
        assert_eq!(transfers[1], Transfer::Command(POWER_SETTING));
        assert!(transfers.contains(&Transfer::Command(TCON_RESOLUTION)));
    }
}
