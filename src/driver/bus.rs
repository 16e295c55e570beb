use super::DriverError;

/// The four wire protocol spoken by the e-paper controllers: commands and data
/// share the SPI lines, a data/command pin tells them apart and the controller
/// reports work in progress on a busy pin.
pub trait PanelBus: Send {
    /// Pulses the reset line.
    fn reset(&mut self) -> Result<(), DriverError>;

    fn command(&mut self, command: u8) -> Result<(), DriverError>;

    fn data(&mut self, data: &[u8]) -> Result<(), DriverError>;

    fn delay_ms(&mut self, ms: u64);

    /// Blocks until the controller reports idle.
    fn wait_until_idle(&mut self) -> Result<(), DriverError>;

    fn command_with_data(&mut self, command: u8, data: &[u8]) -> Result<(), DriverError> {
        self.command(command)?;
        self.data(data)
    }
}

#[cfg(feature = "rpi")]
pub use rpi::RppalBus;

#[cfg(feature = "rpi")]
mod rpi {
    use super::PanelBus;
    use crate::{config::PanelBusConfig, driver::DriverError};
    use log::debug;
    use rppal::{
        gpio::{Gpio, InputPin, OutputPin},
        spi::{Bus, Mode, SlaveSelect, Spi},
    };
    use std::{
        thread,
        time::{Duration, Instant},
    };

    /// Largest transfer the spidev kernel driver accepts by default
    const MAX_TRANSFER: usize = 4096;
    const BUSY_POLL: Duration = Duration::from_millis(100);

    fn bus_error(e: impl std::fmt::Display) -> DriverError {
        DriverError::Bus(e.to_string())
    }

    /// SPI0 plus three GPIO lines of a Raspberry Pi.
    pub struct RppalBus {
        spi: Spi,
        rst: OutputPin,
        dc: OutputPin,
        busy: InputPin,
        busy_timeout: Duration,
    }

    impl RppalBus {
        pub fn new(config: &PanelBusConfig) -> Result<Self, DriverError> {
            let gpio = Gpio::new().map_err(bus_error)?;

            let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, config.spi_clock_hz, Mode::Mode0)
                .map_err(bus_error)?;

            debug!(
                "Opened SPI0 at {} Hz, RST {} DC {} BUSY {}",
                config.spi_clock_hz, config.rst_pin, config.dc_pin, config.busy_pin
            );

            Ok(Self {
                spi,
                rst: gpio.get(config.rst_pin).map_err(bus_error)?.into_output(),
                dc: gpio.get(config.dc_pin).map_err(bus_error)?.into_output(),
                busy: gpio.get(config.busy_pin).map_err(bus_error)?.into_input(),
                busy_timeout: Duration::from_secs(config.busy_timeout_secs),
            })
        }
    }

    impl PanelBus for RppalBus {
        fn reset(&mut self) -> Result<(), DriverError> {
            self.rst.set_low();
            self.delay_ms(200);
            self.rst.set_high();
            self.delay_ms(200);

            Ok(())
        }

        fn command(&mut self, command: u8) -> Result<(), DriverError> {
            self.dc.set_low();
            self.spi.write(&[command]).map_err(bus_error)?;

            Ok(())
        }

        fn data(&mut self, data: &[u8]) -> Result<(), DriverError> {
            self.dc.set_high();
            for chunk in data.chunks(MAX_TRANSFER) {
                self.spi.write(chunk).map_err(bus_error)?;
            }

            Ok(())
        }

        fn delay_ms(&mut self, ms: u64) {
            thread::sleep(Duration::from_millis(ms));
        }

        fn wait_until_idle(&mut self) -> Result<(), DriverError> {
            let started = Instant::now();

            // Low means busy
            while self.busy.is_low() {
                if started.elapsed() > self.busy_timeout {
                    return Err(DriverError::BusyTimeout);
                }
                thread::sleep(BUSY_POLL);
            }

            Ok(())
        }
    }
}
