use async_trait::async_trait;

use crate::transport::{IrSender, Result};

/// Logs every command instead of transmitting it.
#[derive(Debug, Clone)]
pub struct DryRun {
    remote: String,
}

impl DryRun {
    pub fn new(remote: impl Into<String>) -> DryRun {
        DryRun {
            remote: remote.into(),
        }
    }
}

#[async_trait]
impl IrSender for DryRun {
    async fn send_command(&mut self, code: &str) -> Result<()> {
        info!("dry run, not sending {} {}", self.remote, code);
        Ok(())
    }
}
