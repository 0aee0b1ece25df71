use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::transport::{IrSender, Result, TransportError};

/// Reply packet from lircd for a single directive.
///
/// ```text
/// BEGIN
/// <directive>
/// SUCCESS | ERROR
/// [DATA
/// <n>
/// <n lines>]
/// END
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LircReply {
    pub directive: String,
    pub success: bool,
    pub data: Vec<String>,
}

impl LircReply {
    pub fn into_result(self) -> Result<()> {
        if self.success {
            return Ok(());
        }
        let message = if self.data.is_empty() {
            String::from("unknown error")
        } else {
            self.data.join(" ")
        };
        Err(TransportError::Rejected {
            command: self.directive,
            message,
        })
    }
}

/// Client for the lircd socket, sending every command to a single remote.
#[derive(Debug)]
pub struct Lirc<S = UnixStream> {
    remote: String,
    stream: BufReader<S>,
}

impl Lirc<UnixStream> {
    pub async fn connect<P: AsRef<Path>>(path: P, remote: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        info!("connecting to lircd at {}", path.display());
        let stream = UnixStream::connect(path).await?;
        Ok(Self::from_stream(stream, remote))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Lirc<S> {
    pub fn from_stream(stream: S, remote: impl Into<String>) -> Self {
        Lirc {
            remote: remote.into(),
            stream: BufReader::new(stream),
        }
    }

    pub async fn send_once(&mut self, code: &str) -> Result<()> {
        let directive = format!("SEND_ONCE {} {}", self.remote, code);
        debug!("sending lircd directive: {}", directive);
        let writer = self.stream.get_mut();
        writer.write_all(directive.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        self.read_reply(&directive).await?.into_result()
    }

    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.stream.read_line(&mut line).await? == 0 {
            return Err(TransportError::Closed);
        }
        let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
        trace!("lircd: {}", line);
        Ok(line.to_string())
    }

    /// Reads packets until the one answering `directive`. Button broadcasts and
    /// packets for other directives (such as `SIGHUP`) are skipped.
    async fn read_reply(&mut self, directive: &str) -> Result<LircReply> {
        loop {
            let line = self.read_line().await?;
            if line != "BEGIN" {
                trace!("skipping lircd broadcast: {}", line);
                continue;
            }

            let echoed = self.read_line().await?;
            if echoed != directive {
                trace!("skipping lircd packet for {}", echoed);
                self.skip_packet().await?;
                continue;
            }

            let success = match self.read_line().await?.as_str() {
                "SUCCESS" => true,
                "ERROR" => false,
                other => {
                    return Err(TransportError::Protocol(format!(
                        "expected SUCCESS or ERROR, got {:?}",
                        other
                    )))
                }
            };

            let mut data = Vec::new();
            match self.read_line().await?.as_str() {
                "END" => {}
                "DATA" => {
                    let count = self.read_line().await?;
                    let count = count.parse::<usize>().map_err(|_| {
                        TransportError::Protocol(format!("invalid DATA length {:?}", count))
                    })?;
                    for _ in 0..count {
                        data.push(self.read_line().await?);
                    }
                    let end = self.read_line().await?;
                    if end != "END" {
                        return Err(TransportError::Protocol(format!(
                            "expected END, got {:?}",
                            end
                        )));
                    }
                }
                other => {
                    return Err(TransportError::Protocol(format!(
                        "expected DATA or END, got {:?}",
                        other
                    )))
                }
            }

            return Ok(LircReply {
                directive: echoed,
                success,
                data,
            });
        }
    }

    async fn skip_packet(&mut self) -> Result<()> {
        while self.read_line().await? != "END" {}
        Ok(())
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> IrSender for Lirc<S> {
    async fn send_command(&mut self, code: &str) -> Result<()> {
        self.send_once(code).await
    }
}
