// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::Path;

use config::{Config, File};
use midly::num::u4;
use serde::Deserialize;

use super::error::ConfigError;
use super::physics::{Physics, VelocityMapping};

const DEFAULT_INPUT_CHANNEL: u8 = 1;
const DEFAULT_OUTPUT_CHANNEL: u8 = 2;

/// What to do with an inbound MIDI packet that can't be decoded.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorPolicy {
    /// Log the packet and keep going.
    #[default]
    Skip,
    /// Stop the simulation and exit.
    Fatal,
}

/// The configuration for the tombola.
#[derive(Deserialize, Clone, Debug)]
pub struct Tombola {
    /// The MIDI channel (1-16) to spawn balls from.
    #[serde(default = "default_input_channel")]
    input_channel: u8,
    /// The MIDI channel (1-16) that collisions are played on.
    #[serde(default = "default_output_channel")]
    output_channel: u8,
    /// A case insensitive filter on the MIDI device name or id. Empty picks the
    /// first device.
    #[serde(default)]
    device: String,
    #[serde(default)]
    decode_errors: DecodeErrorPolicy,
    #[serde(default)]
    physics: Physics,
    #[serde(default)]
    velocity: VelocityMapping,
}

fn default_input_channel() -> u8 {
    DEFAULT_INPUT_CHANNEL
}

fn default_output_channel() -> u8 {
    DEFAULT_OUTPUT_CHANNEL
}

impl Default for Tombola {
    fn default() -> Self {
        Tombola {
            input_channel: DEFAULT_INPUT_CHANNEL,
            output_channel: DEFAULT_OUTPUT_CHANNEL,
            device: String::new(),
            decode_errors: DecodeErrorPolicy::default(),
            physics: Physics::default(),
            velocity: VelocityMapping::default(),
        }
    }
}

impl Tombola {
    /// Parse the configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Tombola, ConfigError> {
        let tombola = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Tombola>()?;
        tombola.validate()?;
        Ok(tombola)
    }

    /// Checks every value that can't be expressed in the type alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.input_channel()?;
        self.output_channel()?;
        self.physics.validate()
    }

    /// Returns the zero based input channel.
    pub fn input_channel(&self) -> Result<u4, ConfigError> {
        to_channel("input_channel", self.input_channel)
    }

    /// Returns the zero based output channel.
    pub fn output_channel(&self) -> Result<u4, ConfigError> {
        to_channel("output_channel", self.output_channel)
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn decode_errors(&self) -> DecodeErrorPolicy {
        self.decode_errors
    }

    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    pub fn velocity(&self) -> &VelocityMapping {
        &self.velocity
    }

    /// Overrides the one based input channel.
    pub fn with_input_channel(mut self, channel: u8) -> Self {
        self.input_channel = channel;
        self
    }

    /// Overrides the one based output channel.
    pub fn with_output_channel(mut self, channel: u8) -> Self {
        self.output_channel = channel;
        self
    }

    /// Overrides the device filter.
    pub fn with_device(mut self, device: &str) -> Self {
        self.device = device.to_string();
        self
    }

    pub fn with_decode_errors(mut self, decode_errors: DecodeErrorPolicy) -> Self {
        self.decode_errors = decode_errors;
        self
    }

    pub fn with_physics(mut self, physics: Physics) -> Self {
        self.physics = physics;
        self
    }
}

/// Converts a one based channel number into the zero based form used on the wire.
fn to_channel(name: &'static str, value: u8) -> Result<u4, ConfigError> {
    if !(1..=16).contains(&value) {
        return Err(ConfigError::InvalidChannel { name, value });
    }
    Ok(u4::from_int_lossy(value - 1))
}

#[cfg(test)]
mod tests {
    use std::{error::Error, io::Write};

    use midly::num::u4;

    use super::*;

    #[test]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let tombola = Tombola::default();
        assert_eq!(u4::from(0), tombola.input_channel()?);
        assert_eq!(u4::from(1), tombola.output_channel()?);
        assert_eq!("", tombola.device());
        assert_eq!(DecodeErrorPolicy::Skip, tombola.decode_errors());
        Ok(())
    }

    #[test]
    fn test_deserialize_file() -> Result<(), Box<dyn Error>> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        write!(
            file,
            r#"
input_channel: 10
output_channel: 16
device: launchpad
decode_errors: fatal
physics:
  sides: 5
velocity:
  base: 30
"#
        )?;

        let tombola = Tombola::deserialize(file.path())?;
        assert_eq!(u4::from(9), tombola.input_channel()?);
        assert_eq!(u4::from(15), tombola.output_channel()?);
        assert_eq!("launchpad", tombola.device());
        assert_eq!(DecodeErrorPolicy::Fatal, tombola.decode_errors());
        assert_eq!(5, tombola.physics().sides());
        assert_eq!(30.0, tombola.velocity().base());
        assert_eq!(60.0, tombola.velocity().span());
        Ok(())
    }

    #[test]
    fn test_deserialize_rejects_bad_channel() -> Result<(), Box<dyn Error>> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        writeln!(file, "input_channel: 0")?;

        assert!(matches!(
            Tombola::deserialize(file.path()),
            Err(ConfigError::InvalidChannel {
                name: "input_channel",
                value: 0
            })
        ));
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Tombola::deserialize(Path::new("/nonexistent/tombola.yaml")),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_overrides() -> Result<(), Box<dyn Error>> {
        let tombola = Tombola::default()
            .with_input_channel(3)
            .with_output_channel(4)
            .with_device("IAC");
        assert_eq!(u4::from(2), tombola.input_channel()?);
        assert_eq!(u4::from(3), tombola.output_channel()?);
        assert_eq!("IAC", tombola.device());

        assert!(Tombola::default().with_output_channel(17).validate().is_err());
        Ok(())
    }
}
