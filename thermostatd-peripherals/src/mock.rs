//! In-memory transports for testing without an IR transmitter or LCD.
//!
//! Clones share their log, so a test keeps one handle and gives the other to
//! a [`Thermostat`](crate::thermostat::Thermostat).

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::lcd::LcdError;
use crate::transport::{IrSender, LineDisplay, Result, TransportError};

fn lock<T>(log: &Mutex<T>) -> MutexGuard<'_, T> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCommand {
    pub code: String,
    pub at: Instant,
}

/// Records every successfully sent command with the time it was sent.
#[derive(Debug, Clone, Default)]
pub struct RecordingIr {
    sent: Arc<Mutex<Vec<SentCommand>>>,
    fail_on: Option<String>,
}

impl RecordingIr {
    pub fn new() -> RecordingIr {
        RecordingIr::default()
    }

    /// Rejects `code` instead of recording it.
    pub fn fail_on(mut self, code: impl Into<String>) -> RecordingIr {
        self.fail_on = Some(code.into());
        self
    }

    pub fn sent(&self) -> Vec<SentCommand> {
        lock(&self.sent).clone()
    }

    pub fn commands(&self) -> Vec<String> {
        lock(&self.sent).iter().map(|c| c.code.clone()).collect()
    }

    pub fn clear(&self) {
        lock(&self.sent).clear();
    }
}

#[async_trait]
impl IrSender for RecordingIr {
    async fn send_command(&mut self, code: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(code) {
            return Err(TransportError::Rejected {
                command: code.to_string(),
                message: String::from("injected failure"),
            });
        }
        lock(&self.sent).push(SentCommand {
            code: code.to_string(),
            at: Instant::now(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RecordingDisplay {
    columns: usize,
    lines: Arc<Mutex<Vec<(String, String)>>>,
    failing: bool,
}

impl RecordingDisplay {
    pub fn new(columns: usize) -> RecordingDisplay {
        RecordingDisplay {
            columns,
            lines: Arc::default(),
            failing: false,
        }
    }

    /// Every write fails as if the LCD thread had gone away.
    pub fn failing(mut self) -> RecordingDisplay {
        self.failing = true;
        self
    }

    pub fn lines(&self) -> Vec<(String, String)> {
        lock(&self.lines).clone()
    }
}

impl LineDisplay for RecordingDisplay {
    fn columns(&self) -> usize {
        self.columns
    }

    fn write_lines(&mut self, first: &str, second: &str) -> Result<()> {
        if self.failing {
            return Err(LcdError::Send.into());
        }
        lock(&self.lines).push((first.to_string(), second.to_string()));
        Ok(())
    }
}
