//! Seeed LoRa-E5 USB dongle serial port operations.

use std::{
    io::{Error as IoError, ErrorKind},
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    time,
};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

/// Provides functions to control the Seeed LoRa-E5 dongle in packet-test mode.
pub struct LoraE5 {
    port: SerialStream,
    buff: Vec<u8>,
}

const BAUD_RATE: u32 = 9600;
const CMD_SETTLE_MS: u64 = 200;
const READ_CHUNK: usize = 256;
/// Receive notification prefix in packet-test mode.
const RX_PREFIX: &'static str = "+TEST: RX";
const TX_PREAMBLE: u8 = 8;
const RX_PREAMBLE: u8 = 8;

impl LoraE5 {
    /// Create a port stream for the USB dongle device.
    pub fn new(path: &str) -> Result<Self, IoError> {
        let port = tokio_serial::new(path, BAUD_RATE)
            .timeout(Duration::from_secs(1))
            .open_native_async()?;

        Ok(LoraE5 { port, buff: vec![] })
    }

    /// Put the dongle into continuous raw packet receive mode.
    ///
    /// Sends the test mode entry, RF configuration and RX start commands in order. The module
    /// does not answer these commands reliably, so responses are discarded instead of verified.
    pub async fn configure_receiver(
        &mut self,
        mut freq: u32,
        mut sf: u8,
        mut bw: u16,
        mut power: u8,
    ) -> Result<(), IoError> {
        if freq < 150 || freq > 960 {
            freq = 433;
        }
        if sf < 5 || sf > 12 {
            sf = 9;
        }
        bw = match bw {
            250 => 250,
            500 => 500,
            _ => 125,
        };
        if power > 22 {
            power = 14;
        }

        self.send_command("AT+MODE=TEST").await?;
        let cmd = format!(
            "AT+TEST=RFCFG,{},SF{},{},{},{},{}",
            freq, sf, bw, TX_PREAMBLE, RX_PREAMBLE, power
        );
        self.send_command(cmd.as_str()).await?;
        self.send_command("AT+TEST=RXLRPKT").await
    }

    /// Read the next line from the dongle, decoded as text and trimmed.
    ///
    /// Bytes are buffered until a newline arrives. Invalid UTF-8 sequences are replaced, not
    /// rejected.
    pub async fn next_line(&mut self) -> Result<String, IoError> {
        loop {
            if let Some(pos) = self.buff.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buff.drain(..=pos).collect();
                return Ok(String::from_utf8_lossy(&line).trim().to_string());
            }

            let mut chunk = [0u8; READ_CHUNK];
            let size = self.port.read(&mut chunk).await?;
            if size == 0 {
                return Err(IoError::from(ErrorKind::UnexpectedEof));
            }
            self.buff.extend_from_slice(&chunk[..size]);
        }
    }

    /// Write one AT command and discard any response after a short settle delay.
    async fn send_command(&mut self, cmd: &str) -> Result<(), IoError> {
        self.port
            .write_all(format!("{}\r\n", cmd).as_bytes())
            .await?;
        time::sleep(Duration::from_millis(CMD_SETTLE_MS)).await;
        if let Err(e) = self.port.clear(ClearBuffer::Input) {
            return Err(IoError::new(ErrorKind::Other, e.to_string()));
        }
        Ok(())
    }
}

/// Extract the quoted hexadecimal payload from a receive notification line.
///
/// Returns `None` for any line that is not a `+TEST: RX "<hex>"` notification.
pub fn parse_rx_hex(line: &str) -> Option<&str> {
    if !line.starts_with(RX_PREFIX) {
        return None;
    }
    line.split('"').nth(1)
}

/// Decode a hexadecimal payload into UTF-8 text.
pub fn decode_payload(hex_str: &str) -> Result<String, IoError> {
    let raw = match hex::decode(hex_str) {
        Err(e) => return Err(IoError::new(ErrorKind::InvalidData, e)),
        Ok(raw) => raw,
    };
    match String::from_utf8(raw) {
        Err(e) => Err(IoError::new(ErrorKind::InvalidData, e)),
        Ok(text) => Ok(text),
    }
}

/// Names of the serial ports detected on this system.
pub fn available_port_names() -> Vec<String> {
    match tokio_serial::available_ports() {
        Err(_) => vec![],
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
    }
}
