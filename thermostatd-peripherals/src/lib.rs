#[macro_use]
extern crate log;

use thiserror::Error;

pub mod ir;
pub mod lcd;
pub mod mock;
pub mod thermostat;
pub mod transport;

#[derive(Error, Clone, Debug)]
pub enum I2cError {
    #[error("Could not initialize i2c")]
    Initialization,
    #[error("Could not set slave address to {0}")]
    SlaveAddr(u16),
}
