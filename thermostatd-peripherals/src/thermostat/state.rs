use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::thermostat::{EnumKind, Result, ThermostatError};

pub const TEMPERATURE_RANGE: RangeInclusive<i32> = 64..=88;

/// The heat command set only covers a lower band.
pub const HEAT_TEMPERATURE_RANGE: RangeInclusive<i32> = 60..=76;

pub const DEFAULT_TARGET_TEMPERATURE: i32 = 72;

/// Sent for every state that is not powered on.
pub const TURN_OFF_COMMAND: &str = "turn-off";

#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[derive(Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Mode {
    #[default]
    Cool,
    Dry,
    Heat,
    Fan,
}

impl Mode {
    pub const fn lirc_token(self) -> &'static str {
        match self {
            Mode::Cool => "cool",
            Mode::Dry => "dry",
            Mode::Heat => "heat",
            Mode::Fan => "fan",
        }
    }

    pub const fn temperature_range(self) -> RangeInclusive<i32> {
        match self {
            Mode::Heat => HEAT_TEMPERATURE_RANGE,
            Mode::Cool | Mode::Dry | Mode::Fan => TEMPERATURE_RANGE,
        }
    }
}

impl FromStr for Mode {
    type Err = ThermostatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "COOL" => Ok(Mode::Cool),
            "DRY" => Ok(Mode::Dry),
            "HEAT" => Ok(Mode::Heat),
            "FAN" => Ok(Mode::Fan),
            _ => Err(ThermostatError::InvalidEnum(EnumKind::Mode)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[derive(Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum FanSpeed {
    /// Unit picks the speed itself
    #[default]
    Auto,
    /// 1/4
    Quiet,
    /// 2/4
    Low,
    /// 3/4
    Medium,
    /// 4/4
    High,
}

impl FanSpeed {
    pub const fn lirc_token(self) -> &'static str {
        match self {
            FanSpeed::Auto => "auto",
            FanSpeed::Quiet => "quiet",
            FanSpeed::Low => "low",
            FanSpeed::Medium => "medium",
            FanSpeed::High => "high",
        }
    }
}

impl FromStr for FanSpeed {
    type Err = ThermostatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AUTO" => Ok(FanSpeed::Auto),
            "QUIET" => Ok(FanSpeed::Quiet),
            "LOW" => Ok(FanSpeed::Low),
            "MEDIUM" => Ok(FanSpeed::Medium),
            "HIGH" => Ok(FanSpeed::High),
            _ => Err(ThermostatError::InvalidEnum(EnumKind::FanSpeed)),
        }
    }
}

/// Settings of the unit. Temperatures are in Fahrenheit.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub powered_on: bool,
    pub current_mode: Mode,
    pub fan_speed: FanSpeed,
    pub target_temperature: i32,
    /// Reported by a thermometer, currently not in use.
    pub current_temperature: i32,
}

impl Default for State {
    fn default() -> Self {
        State {
            powered_on: false,
            current_mode: Mode::default(),
            fan_speed: FanSpeed::default(),
            target_temperature: DEFAULT_TARGET_TEMPERATURE,
            current_temperature: 0,
        }
    }
}

impl State {
    pub fn is_valid(&self) -> bool {
        let temp = self.target_temperature;
        self.current_mode.temperature_range().contains(&temp) && temp % 2 == 0
    }

    fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ThermostatError::InvalidState)
        }
    }

    /// Full settings command, e.g. `cool-auto-72F` or `fan-high`.
    pub fn to_command(&self) -> Result<String> {
        self.ensure_valid()?;
        if !self.powered_on {
            return Ok(TURN_OFF_COMMAND.to_string());
        }

        let mut cmd = format!(
            "{}-{}",
            self.current_mode.lirc_token(),
            self.fan_speed.lirc_token()
        );
        if self.current_mode != Mode::Fan {
            cmd.push_str(&format!("-{}F", self.target_temperature));
        }
        Ok(cmd)
    }

    /// Sent ahead of [`State::to_command`] when the unit is switched on.
    pub fn to_power_on_command(&self) -> Result<String> {
        self.ensure_valid()?;
        if !self.powered_on {
            return Ok(TURN_OFF_COMMAND.to_string());
        }
        Ok(format!("{}-on", self.current_mode.lirc_token()))
    }

    fn update<F: FnOnce(&mut State)>(&mut self, change: F) -> Result<()> {
        let mut draft = self.clone();
        change(&mut draft);
        draft.ensure_valid()?;
        *self = draft;
        Ok(())
    }

    pub fn set_power(&mut self, power: bool) -> Result<()> {
        self.update(|s| s.powered_on = power)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.update(|s| s.current_mode = mode)
    }

    pub fn set_fan_speed(&mut self, speed: FanSpeed) -> Result<()> {
        self.update(|s| s.fan_speed = speed)
    }

    pub fn set_target_temperature(&mut self, temp: i32) -> Result<()> {
        self.update(|s| s.target_temperature = temp)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn powered(mode: Mode, fan_speed: FanSpeed, target_temperature: i32) -> State {
        State {
            powered_on: true,
            current_mode: mode,
            fan_speed,
            target_temperature,
            current_temperature: 0,
        }
    }

    fn valid_states() -> impl Iterator<Item = State> {
        Mode::iter().flat_map(|mode| {
            FanSpeed::iter().flat_map(move |speed| {
                mode.temperature_range()
                    .step_by(2)
                    .map(move |temp| powered(mode, speed, temp))
            })
        })
    }

    #[test]
    fn default_state_is_valid_and_off() {
        let state = State::default();
        assert!(state.is_valid());
        assert!(!state.powered_on);
        assert_eq!(state.current_mode, Mode::Cool);
        assert_eq!(state.fan_speed, FanSpeed::Auto);
        assert_eq!(state.target_temperature, 72);
        assert_eq!(state.current_temperature, 0);
    }

    #[test]
    fn accepts_range_boundaries() {
        assert!(powered(Mode::Heat, FanSpeed::Auto, 60).is_valid());
        assert!(powered(Mode::Heat, FanSpeed::Auto, 76).is_valid());
        for mode in [Mode::Cool, Mode::Dry, Mode::Fan] {
            assert!(powered(mode, FanSpeed::Auto, 64).is_valid());
            assert!(powered(mode, FanSpeed::Auto, 88).is_valid());
        }
    }

    #[test]
    fn rejects_out_of_range_and_odd_temperatures() {
        for temp in [58, 59, 61, 73, 77, 78] {
            assert!(!powered(Mode::Heat, FanSpeed::Auto, temp).is_valid(), "{}", temp);
        }
        for mode in [Mode::Cool, Mode::Dry, Mode::Fan] {
            for temp in [60, 62, 63, 65, 87, 89, 90] {
                assert!(!powered(mode, FanSpeed::Auto, temp).is_valid(), "{} {}", mode, temp);
            }
        }
        assert!(!powered(Mode::Cool, FanSpeed::Auto, -72).is_valid());
    }

    #[test]
    fn validity_ignores_power_and_current_temperature() {
        let mut state = powered(Mode::Cool, FanSpeed::Low, 70);
        state.current_temperature = -1000;
        assert!(state.is_valid());
        state.powered_on = false;
        assert!(state.is_valid());
    }

    #[test]
    fn commands_use_mapped_tokens() {
        for state in valid_states() {
            let cmd = state.to_command().expect("valid state");
            let mut parts = cmd.split('-');
            assert_eq!(parts.next(), Some(state.current_mode.lirc_token()));
            assert_eq!(parts.next(), Some(state.fan_speed.lirc_token()));
            if state.current_mode == Mode::Fan {
                assert_eq!(parts.next(), None, "{}", cmd);
            } else {
                assert_eq!(
                    parts.next(),
                    Some(format!("{}F", state.target_temperature).as_str())
                );
            }
        }
    }

    #[test]
    fn unpowered_states_always_turn_off() {
        for mut state in valid_states() {
            state.powered_on = false;
            assert_eq!(state.to_command().unwrap(), "turn-off");
            assert_eq!(state.to_power_on_command().unwrap(), "turn-off");
        }
    }

    #[test]
    fn command_examples() {
        assert_eq!(
            powered(Mode::Cool, FanSpeed::Auto, 72).to_command().unwrap(),
            "cool-auto-72F"
        );
        assert_eq!(
            powered(Mode::Heat, FanSpeed::Quiet, 60).to_command().unwrap(),
            "heat-quiet-60F"
        );
        assert_eq!(
            powered(Mode::Fan, FanSpeed::High, 80).to_command().unwrap(),
            "fan-high"
        );
        assert_eq!(
            powered(Mode::Dry, FanSpeed::Medium, 64)
                .to_power_on_command()
                .unwrap(),
            "dry-on"
        );
    }

    #[test]
    fn invalid_state_has_no_command() {
        let state = powered(Mode::Heat, FanSpeed::Auto, 80);
        assert!(matches!(state.to_command(), Err(ThermostatError::InvalidState)));
        assert!(matches!(
            state.to_power_on_command(),
            Err(ThermostatError::InvalidState)
        ));
    }

    #[test]
    fn rejected_setter_leaves_state_untouched() {
        let mut state = State::default();
        state.set_mode(Mode::Heat).unwrap();
        let before = state.clone();

        assert!(matches!(
            state.set_target_temperature(80),
            Err(ThermostatError::InvalidState)
        ));
        assert!(matches!(
            state.set_target_temperature(63),
            Err(ThermostatError::InvalidState)
        ));
        assert_eq!(state, before);

        state.set_target_temperature(62).unwrap();
        // 62 is below the floor outside of heat mode
        assert!(state.set_mode(Mode::Cool).is_err());
        assert_eq!(state.current_mode, Mode::Heat);
    }

    #[test]
    fn setters_commit_single_field() {
        let mut state = State::default();
        state.set_power(true).unwrap();
        state.set_fan_speed(FanSpeed::High).unwrap();
        state.set_target_temperature(88).unwrap();
        assert_eq!(state, powered(Mode::Cool, FanSpeed::High, 88));
    }

    #[test]
    fn parses_exact_api_tokens() {
        assert_eq!("HEAT".parse::<Mode>().unwrap(), Mode::Heat);
        assert_eq!("DRY".parse::<Mode>().unwrap(), Mode::Dry);
        assert_eq!("MEDIUM".parse::<FanSpeed>().unwrap(), FanSpeed::Medium);
        for token in ["cool", "Heat", "fan "] {
            assert!(matches!(
                token.parse::<Mode>(),
                Err(ThermostatError::InvalidEnum(EnumKind::Mode))
            ));
        }
        assert!("medium".parse::<FanSpeed>().is_err());
        assert!(matches!(
            "warm".parse::<Mode>(),
            Err(ThermostatError::InvalidEnum(EnumKind::Mode))
        ));
        assert_eq!(
            "".parse::<FanSpeed>().unwrap_err().to_string(),
            "invalid fan speed"
        );
    }

    #[test]
    fn display_matches_api_tokens() {
        for mode in Mode::iter() {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
        assert_eq!(Mode::Cool.to_string(), "COOL");
        assert_eq!(FanSpeed::Quiet.to_string(), "QUIET");
    }

    #[test]
    fn serializes_with_api_field_names() {
        let json = serde_json::to_value(State::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "powered_on": false,
                "current_mode": "COOL",
                "fan_speed": "AUTO",
                "target_temperature": 72,
                "current_temperature": 0,
            })
        );
    }
}
