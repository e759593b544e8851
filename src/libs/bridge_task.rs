//! Bridge task handles LoRa-to-cloud forwarding:
//! - Put the LoRa-E5 dongle into continuous receive mode.
//! - Decode every receive notification into a JSON reading.
//! - Upload each reading to the remote database once, without retries.

use std::{
    error::Error as StdError,
    io::{Error as IoError, ErrorKind},
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use log::{error, info, warn};
use serde_json::{Map, Value, json};
use tokio::{
    task::{self, JoinHandle},
    time,
};
use url::Url;

use super::{
    lora_e5::{self, LoraE5},
    uploader::{UploadOutcome, Uploader},
};

pub struct Options {
    pub dev_path: String,
    /// Frequency in MHz.
    pub freq: u32,
    /// Spreading factor.
    pub sf: u8,
    /// Bandwidth in kHz.
    pub bw: u16,
    /// TX power in dBm.
    pub power: u8,
    /// Database URL that receives one POST per reading.
    pub url: String,
}

#[derive(Clone)]
pub struct BridgeTask {
    task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

/// Why a received packet was dropped before upload.
#[derive(Debug)]
enum DecodeError {
    /// Hex or UTF-8 decoding failed.
    Payload(IoError),
    /// The payload text is not valid JSON.
    Json(serde_json::Error),
    /// The payload is valid JSON but not an object.
    NotObject,
}

const SLEEP_READ_ERR_MS: u64 = 1000;

impl BridgeTask {
    /// Open the dongle, put it into receive mode and start the forwarding loop.
    pub async fn new(opts: Options) -> Result<Self, Box<dyn StdError>> {
        const FN_NAME: &'static str = "BridgeTask::new";

        let url = match Url::parse(opts.url.as_str()) {
            Err(e) => {
                error!("[{}] invalid URL {}: {}", FN_NAME, opts.url, e);
                return Err(Box::new(IoError::new(ErrorKind::InvalidInput, e)));
            }
            Ok(url) => url,
        };
        let mut port = match LoraE5::new(opts.dev_path.as_str()) {
            Err(e) => {
                error!("[{}] create port {} error: {}", FN_NAME, opts.dev_path, e);
                return Err(Box::new(e));
            }
            Ok(port) => port,
        };
        if let Err(e) = port
            .configure_receiver(opts.freq, opts.sf, opts.bw, opts.power)
            .await
        {
            error!("[{}] configure receiver error: {}", FN_NAME, e);
            return Err(Box::new(e));
        }
        info!("[{}] listening on {}", FN_NAME, opts.dev_path);

        let task = BridgeTask {
            task_handle: Arc::new(Mutex::new(None)),
        };
        {
            *task.task_handle.lock().unwrap() = Some(create_event_loop(port, Uploader::new(url)));
        }
        Ok(task)
    }
}

/// To create an event loop runtime task.
fn create_event_loop(mut port: LoraE5, uploader: Uploader) -> JoinHandle<()> {
    task::spawn(async move {
        const FN_NAME: &'static str = "event_loop";
        // Main loop.
        loop {
            let line = match port.next_line().await {
                Err(e) => {
                    error!("[{}] read line error: {}", FN_NAME, e);
                    time::sleep(Duration::from_millis(SLEEP_READ_ERR_MS)).await;
                    continue;
                }
                Ok(line) => line,
            };

            let mut reading = match decode_reading(line.as_str()) {
                None => continue,
                Some(Err(DecodeError::Payload(e))) => {
                    error!("[{}] process line error: {}", FN_NAME, e);
                    continue;
                }
                Some(Err(DecodeError::Json(e))) => {
                    warn!("[{}] payload is not valid JSON, skipping: {}", FN_NAME, e);
                    continue;
                }
                Some(Err(DecodeError::NotObject)) => {
                    error!("[{}] process line error: payload is not an object", FN_NAME);
                    continue;
                }
                Some(Ok(reading)) => reading,
            };
            add_server_timestamp(&mut reading);

            match uploader.upload(&reading).await {
                Err(e) => error!("[{}] upload failed, check the connection: {}", FN_NAME, e),
                Ok(UploadOutcome::Accepted { name }) => match name {
                    None => info!("[{}] reading uploaded", FN_NAME),
                    Some(name) => info!("[{}] reading uploaded, name: {}", FN_NAME, name),
                },
                Ok(UploadOutcome::Rejected { status, body }) => {
                    warn!("[{}] upload rejected: {} - {}", FN_NAME, status, body)
                }
            }
        }
    })
}

/// Decode one serial line into an upload-ready reading.
///
/// `None` means the line is not a receive notification. A line that looks like a packet but
/// fails a decoding step reports the failed step so the loop can log it. The packet is dropped
/// either way and never reprocessed.
fn decode_reading(line: &str) -> Option<Result<Map<String, Value>, DecodeError>> {
    const FN_NAME: &'static str = "decode_reading";

    let hex_str = lora_e5::parse_rx_hex(line)?;
    let text = match lora_e5::decode_payload(hex_str) {
        Err(e) => return Some(Err(DecodeError::Payload(e))),
        Ok(text) => text,
    };
    info!("[{}] received raw data: {}", FN_NAME, text);

    let value = match serde_json::from_str::<Value>(text.as_str()) {
        Err(e) => return Some(Err(DecodeError::Json(e))),
        Ok(value) => value,
    };
    match value {
        Value::Object(reading) => Some(Ok(reading)),
        _ => Some(Err(DecodeError::NotObject)),
    }
}

/// Stamp the upload time as fractional Unix seconds when the device did not send its own
/// `timestamp` field.
fn add_server_timestamp(reading: &mut Map<String, Value>) {
    if reading.contains_key("timestamp") {
        return;
    }
    let now = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
    reading.insert("server_timestamp".to_string(), json!(now));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rx_line(payload: &str) -> String {
        format!("+TEST: RX \"{}\"", hex::encode(payload))
    }

    #[test]
    fn decode_reading_accepts_object_payload() {
        let line = rx_line("{\"device\":\"node-1\",\"temperature\":25.5,\"humidity\":61}");
        let reading = decode_reading(line.as_str()).unwrap().unwrap();
        assert_eq!(reading.get("device"), Some(&json!("node-1")));
        assert_eq!(reading.get("temperature"), Some(&json!(25.5)));
        assert_eq!(reading.get("humidity"), Some(&json!(61)));
    }

    #[test]
    fn decode_reading_skips_unrelated_lines() {
        assert!(decode_reading("").is_none());
        assert!(decode_reading("+AT: OK").is_none());
        assert!(decode_reading("+TEST: RXLRPKT").is_none());
        assert!(decode_reading("+TEST: LEN:24, RSSI:-45, SNR:9").is_none());
        assert!(decode_reading("+TEST: RX no quoted payload").is_none());
    }

    #[test]
    fn decode_reading_reports_payload_errors() {
        match decode_reading("+TEST: RX \"zz\"") {
            Some(Err(DecodeError::Payload(_))) => (),
            other => panic!("invalid hex not reported: {:?}", other),
        }
        match decode_reading("+TEST: RX \"FFFE\"") {
            Some(Err(DecodeError::Payload(_))) => (),
            other => panic!("invalid UTF-8 not reported: {:?}", other),
        }
    }

    #[test]
    fn decode_reading_reports_invalid_json() {
        let line = rx_line("hello sensor");
        match decode_reading(line.as_str()) {
            Some(Err(DecodeError::Json(_))) => (),
            other => panic!("invalid JSON not reported: {:?}", other),
        }
    }

    #[test]
    fn decode_reading_reports_non_object_json() {
        for payload in ["[1,2,3]", "42", "\"hello\"", "null"] {
            let line = rx_line(payload);
            match decode_reading(line.as_str()) {
                Some(Err(DecodeError::NotObject)) => (),
                other => panic!("{} not reported as non-object: {:?}", payload, other),
            }
        }
    }

    #[test]
    fn server_timestamp_added_when_missing() {
        let mut reading = Map::new();
        reading.insert("temperature".to_string(), json!(25.5));

        add_server_timestamp(&mut reading);
        let stamp = reading.get("server_timestamp").unwrap();
        assert!(stamp.as_f64().unwrap() > 0.0);
        assert_eq!(reading.get("temperature"), Some(&json!(25.5)));
    }

    #[test]
    fn server_timestamp_skipped_when_device_sent_one() {
        let mut reading = Map::new();
        reading.insert("timestamp".to_string(), json!(1700000000));

        add_server_timestamp(&mut reading);
        assert!(!reading.contains_key("server_timestamp"));
        assert_eq!(reading.len(), 1);
    }
}
