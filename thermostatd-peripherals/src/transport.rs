use async_trait::async_trait;
use thiserror::Error;

use crate::lcd::LcdError;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("lircd rejected {command}: {message}")]
    Rejected { command: String, message: String },
    #[error("Malformed lircd reply: {0}")]
    Protocol(String),
    #[error("lircd closed the connection")]
    Closed,
    #[error(transparent)]
    Lcd(#[from] LcdError),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Something that can transmit a named infrared command for the configured remote.
#[async_trait]
pub trait IrSender: Send {
    async fn send_command(&mut self, code: &str) -> Result<()>;
}

/// A two line character display.
///
/// Lines handed to [`LineDisplay::write_lines`] are expected to already be
/// padded or truncated to [`LineDisplay::columns`].
pub trait LineDisplay: Send {
    fn columns(&self) -> usize;
    fn write_lines(&mut self, first: &str, second: &str) -> Result<()>;
}
