pub mod state;

use std::fmt;

use strum_macros::Display;
use thiserror::Error;
use tokio::time::{sleep, Duration};

use crate::transport::{IrSender, LineDisplay, TransportError};

pub use state::{FanSpeed, Mode, State};

/// Time the unit needs after a `*-on` command before it accepts settings.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Display, Clone, Copy, Debug, Eq, PartialEq)]
pub enum EnumKind {
    #[strum(serialize = "mode")]
    Mode,
    #[strum(serialize = "fan speed")]
    FanSpeed,
}

#[derive(Error, Debug)]
pub enum ThermostatError {
    #[error("invalid state")]
    InvalidState,
    #[error("invalid {0}")]
    InvalidEnum(EnumKind),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, ThermostatError>;

/// Pads or truncates `line` to exactly `columns` characters.
pub fn pad_line(line: &str, columns: usize) -> String {
    let truncated: String = line.chars().take(columns).collect();
    format!("{:<width$}", truncated, width = columns)
}

/// The unit being controlled. Every committed state has been sent to the
/// IR transport, unless that send failed.
pub struct Thermostat {
    state: State,
    ir: Box<dyn IrSender>,
    display: Option<Box<dyn LineDisplay>>,
}

impl fmt::Debug for Thermostat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thermostat")
            .field("state", &self.state)
            .field("display", &self.display.is_some())
            .finish_non_exhaustive()
    }
}

impl Thermostat {
    pub fn new(ir: Box<dyn IrSender>) -> Thermostat {
        Thermostat {
            state: State::default(),
            ir,
            display: None,
        }
    }

    pub fn with_display(mut self, display: Box<dyn LineDisplay>) -> Thermostat {
        self.display = Some(display);
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    async fn send_command(&mut self, cmd: &str) -> Result<()> {
        debug!("sending command {}", cmd);
        Ok(self.ir.send_command(cmd).await?)
    }

    /// The heat command already starts the unit, so heat mode has no `*-on` step.
    async fn send_on_state(&mut self) -> Result<()> {
        if self.state.current_mode == Mode::Heat {
            return Ok(());
        }
        let cmd = self.state.to_power_on_command()?;
        self.send_command(&cmd).await
    }

    async fn power_on_and_settle(&mut self) -> Result<()> {
        self.send_on_state().await?;
        trace!("waiting {:?} for unit to settle", SETTLE_DELAY);
        sleep(SETTLE_DELAY).await;
        Ok(())
    }

    async fn send_current_state(&mut self) -> Result<()> {
        let cmd = self.state.to_command()?;
        self.send_command(&cmd).await?;
        self.update_display()
    }

    fn update_display(&mut self) -> Result<()> {
        let display = match self.display.as_mut() {
            Some(d) => d,
            None => return Ok(()),
        };
        let columns = display.columns();
        let (first, second) = if self.state.powered_on {
            (
                format!(
                    "Temp: {}F ({})",
                    self.state.target_temperature, self.state.current_mode
                ),
                format!("Fan: {}", self.state.fan_speed),
            )
        } else {
            // padded below to a full blank line, the lcd keeps characters it is not sent
            (String::from("Thermostat Off"), String::new())
        };
        display.write_lines(&pad_line(&first, columns), &pad_line(&second, columns))?;
        Ok(())
    }

    /// Back to defaults, then sends them.
    pub async fn reset(&mut self) -> Result<()> {
        self.state = State::default();
        self.send_current_state().await
    }

    pub async fn set_power(&mut self, power: bool) -> Result<()> {
        self.state.set_power(power)?;
        if power {
            self.power_on_and_settle().await?;
        }
        self.send_current_state().await
    }

    pub async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.state.set_mode(mode)?;
        self.send_current_state().await
    }

    pub async fn set_fan_speed(&mut self, speed: FanSpeed) -> Result<()> {
        self.state.set_fan_speed(speed)?;
        self.send_current_state().await
    }

    pub async fn set_target_temperature(&mut self, temp: i32) -> Result<()> {
        self.state.set_target_temperature(temp)?;
        self.send_current_state().await
    }

    /// Replaces the whole state. The new state is committed before anything
    /// is sent; a failed send does not roll it back.
    pub async fn set_state(&mut self, state: State) -> Result<()> {
        if !state.is_valid() {
            return Err(ThermostatError::InvalidState);
        }

        let powering_on = !self.state.powered_on && state.powered_on;
        debug!("committing state {:?}", state);
        self.state = state;

        if powering_on {
            self.power_on_and_settle().await?;
        }
        self.send_current_state().await
    }
}
