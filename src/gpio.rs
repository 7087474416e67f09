use chrono::{DateTime, Local};
use rppal::gpio::{Event, Gpio, InputPin, Trigger};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::config::GpioSettings;

#[derive(Debug, Error)]
pub enum GpioError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

/// One debounced button press
#[derive(Clone, Copy, Debug)]
pub struct Press {
    pub at: DateTime<Local>,
}

/// Watches the doorbell switch and forwards presses into a channel.
///
/// The interrupt is registered for as long as the watcher lives.
pub struct ButtonWatcher {
    pin: InputPin,
}

impl ButtonWatcher {
    /// Configures the switch pin as pull-up input and reports rising edges.
    pub fn watch(settings: &GpioSettings, presses: mpsc::Sender<Press>) -> Result<Self, GpioError> {
        let mut pin = Gpio::new()?.get(settings.switch_pin)?.into_input_pullup();
        let pin_number = settings.switch_pin;

        // Läuft im Interrupt-Thread von rppal, darf nicht blockieren
        pin.set_async_interrupt(
            Trigger::RisingEdge,
            Some(settings.debounce),
            move |event: Event| {
                debug!(pin = pin_number, ?event, "Button pressed!");
                match presses.try_send(Press { at: Local::now() }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(pin = pin_number, "Press queue full, dropping button press")
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(pin = pin_number, "Press receiver gone")
                    }
                }
            },
        )?;

        info!(
            pin = pin_number,
            debounce_ms = settings.debounce.as_millis() as u64,
            "Watching doorbell button"
        );
        Ok(Self { pin })
    }

    pub fn pin(&self) -> u8 {
        self.pin.pin()
    }
}
