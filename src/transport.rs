use std::fmt;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::time::{timeout_at, Instant};
use tokio_serial::SerialPortBuilderExt;

use crate::at::AtCommand;
use crate::Result;

/// Byte stream the radio module is reachable through.
pub trait RadioLink: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> RadioLink for T {}

/// Line-oriented connection to an AT-command radio module.
pub struct AtPort {
    stream: BufStream<Box<dyn RadioLink>>,
    /// Bytes of a line whose read was interrupted by a deadline.
    pending: Vec<u8>,
}

impl fmt::Debug for AtPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtPort")
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl AtPort {
    pub fn new(link: impl RadioLink + 'static) -> Self {
        Self {
            stream: BufStream::new(Box::new(link)),
            pending: Vec::new(),
        }
    }

    /// Opens a serial port with 8N1 framing.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        log::debug!("Opening serial port {} at {} baud", path, baud_rate);

        let port = tokio_serial::new(path, baud_rate).open_native_async()?;

        Ok(Self::new(port))
    }

    pub async fn send(&mut self, command: &AtCommand) -> Result<()> {
        log::debug!("<< {}", command);

        self.stream
            .write_all(format!("{}\r\n", command).as_bytes())
            .await?;
        self.stream.flush().await?;

        Ok(())
    }

    /// Reads the next non-empty line, without its line terminator.
    ///
    /// Returns `None` when `deadline` passes or the link is closed. A line
    /// cut off by the deadline is completed by the next call.
    pub async fn read_line_until(&mut self, deadline: Instant) -> Result<Option<String>> {
        loop {
            let read = timeout_at(deadline, self.stream.read_until(b'\n', &mut self.pending)).await;

            let eof = match read {
                Err(_elapsed) => return Ok(None),
                Ok(result) => result? == 0,
            };

            let line = String::from_utf8_lossy(&self.pending).trim().to_owned();
            self.pending.clear();

            if !line.is_empty() {
                log::trace!(">> {}", line);
                return Ok(Some(line));
            }
            if eof {
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt};

    fn soon() -> Instant {
        Instant::now() + Duration::from_millis(200)
    }

    #[tokio::test]
    async fn writes_crlf_terminated_commands() {
        let (radio, mut module) = duplex(256);
        let mut port = AtPort::new(radio);

        port.send(&AtCommand::Dual).await.unwrap();
        port.send(&AtCommand::GapScan { seconds: 3 }).await.unwrap();

        let mut buf = vec![0u8; 23];
        module.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, b"AT+DUAL\r\nAT+GAPSCAN=3\r\n");
    }

    #[tokio::test]
    async fn reads_lines_and_skips_blank_ones() {
        let (radio, mut module) = duplex(256);
        let mut port = AtPort::new(radio);

        module.write_all(b"OK\r\n\r\nscan done\r\n").await.unwrap();

        assert_eq!(port.read_line_until(soon()).await.unwrap().as_deref(), Some("OK"));
        assert_eq!(
            port.read_line_until(soon()).await.unwrap().as_deref(),
            Some("scan done")
        );
        assert_eq!(port.read_line_until(soon()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn partial_line_survives_deadline() {
        let (radio, mut module) = duplex(256);
        let mut port = AtPort::new(radio);

        module.write_all(b"Device Da").await.unwrap();
        assert_eq!(port.read_line_until(soon()).await.unwrap(), None);

        module.write_all(b"ta [ADV]: 020106\n").await.unwrap();
        assert_eq!(
            port.read_line_until(soon()).await.unwrap().as_deref(),
            Some("Device Data [ADV]: 020106")
        );
    }

    #[tokio::test]
    async fn closed_link_flushes_last_line() {
        let (radio, mut module) = duplex(256);
        let mut port = AtPort::new(radio);

        module.write_all(b"last").await.unwrap();
        drop(module);

        assert_eq!(port.read_line_until(soon()).await.unwrap().as_deref(), Some("last"));
        assert_eq!(port.read_line_until(soon()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let (radio, mut module) = duplex(256);
        let mut port = AtPort::new(radio);

        module.write_all(b"name \xFF\n").await.unwrap();
        assert_eq!(
            port.read_line_until(soon()).await.unwrap().as_deref(),
            Some("name \u{FFFD}")
        );
    }
}
