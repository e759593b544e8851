//! Program configurations.

use std::env;

use clap::{Arg, ArgMatches, Command};
use serde::Deserialize;

/// Configuration file object.
#[derive(Default, Deserialize)]
pub struct Config {
    /// Serial port device path such as `/dev/ttyUSB0` or `COM13`.
    #[serde(rename = "devPath")]
    pub dev_path: Option<String>,
    /// Frequency in MHz.
    pub freq: Option<u32>,
    /// Spreading factor.
    pub sf: Option<u8>,
    /// Bandwidth in kHz.
    pub bw: Option<u16>,
    /// TX power in dBm.
    pub power: Option<u8>,
    /// Database URL that receives one POST per reading.
    pub url: Option<String>,
}

pub const DEF_DEV_PATH: &'static str = "/dev/ttyUSB0";
pub const DEF_FREQ: u32 = 433;
pub const DEF_FREQ_STR: &'static str = "433";
pub const DEF_SF: u8 = 9;
pub const DEF_SF_STR: &'static str = "9";
pub const DEF_BW: u16 = 125;
pub const DEF_BW_STR: &'static str = "125";
pub const DEF_POWER: u8 = 14;
pub const DEF_POWER_STR: &'static str = "14";
pub const DEF_URL: &'static str =
    "https://sensor-readings-demo-default-rtdb.firebaseio.com/sensor_readings.json";

/// To register Clap arguments.
pub fn reg_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("lora-e5-bridge.dev-path")
            .long("lora-e5-bridge.dev-path")
            .help("Device path such as `/dev/ttyUSB0` or `COM13`")
            .num_args(1)
            .default_value(DEF_DEV_PATH),
    )
    .arg(
        Arg::new("lora-e5-bridge.freq")
            .long("lora-e5-bridge.freq")
            .help("Frequency (MHz). 150~960")
            .num_args(1)
            .value_parser(150..=960)
            .default_value(DEF_FREQ_STR),
    )
    .arg(
        Arg::new("lora-e5-bridge.sf")
            .long("lora-e5-bridge.sf")
            .help("Spreading factor. 5~12")
            .num_args(1)
            .value_parser(5..=12)
            .default_value(DEF_SF_STR),
    )
    .arg(
        Arg::new("lora-e5-bridge.bw")
            .long("lora-e5-bridge.bw")
            .help("Bandwidth (kHz). 125, 250 or 500")
            .num_args(1)
            .value_parser(125..=500)
            .default_value(DEF_BW_STR),
    )
    .arg(
        Arg::new("lora-e5-bridge.power")
            .long("lora-e5-bridge.power")
            .help("TX power (dBm). 0~22")
            .num_args(1)
            .value_parser(0..=22)
            .default_value(DEF_POWER_STR),
    )
    .arg(
        Arg::new("lora-e5-bridge.url")
            .long("lora-e5-bridge.url")
            .help("Database URL that receives readings. Firebase RTDB paths end with `.json`")
            .num_args(1)
            .default_value(DEF_URL),
    )
}

/// To read input arguments from command-line arguments and environment variables.
///
/// This function will call [`apply_default()`] to fill missing values so you do not need call it
/// again.
pub fn read_args(args: &ArgMatches) -> Config {
    apply_default(&Config {
        dev_path: match args.get_one::<String>("lora-e5-bridge.dev-path") {
            None => match env::var("LORA_E5_BRIDGE_DEV_PATH") {
                Err(_) => None,
                Ok(v) => Some(v),
            },
            Some(v) => Some(v.clone()),
        },
        freq: match args.get_one::<i64>("lora-e5-bridge.freq") {
            None => match env::var("LORA_E5_BRIDGE_FREQ") {
                Err(_) => Some(DEF_FREQ),
                Ok(v) => match v.parse::<u32>() {
                    Err(_) => Some(DEF_FREQ),
                    Ok(v) => Some(v),
                },
            },
            Some(v) => Some(*v as u32),
        },
        sf: match args.get_one::<i64>("lora-e5-bridge.sf") {
            None => match env::var("LORA_E5_BRIDGE_SF") {
                Err(_) => Some(DEF_SF),
                Ok(v) => match v.parse::<u8>() {
                    Err(_) => Some(DEF_SF),
                    Ok(v) => Some(v),
                },
            },
            Some(v) => Some(*v as u8),
        },
        bw: match args.get_one::<i64>("lora-e5-bridge.bw") {
            None => match env::var("LORA_E5_BRIDGE_BW") {
                Err(_) => Some(DEF_BW),
                Ok(v) => match v.parse::<u16>() {
                    Err(_) => Some(DEF_BW),
                    Ok(v) => Some(v),
                },
            },
            Some(v) => Some(*v as u16),
        },
        power: match args.get_one::<i64>("lora-e5-bridge.power") {
            None => match env::var("LORA_E5_BRIDGE_POWER") {
                Err(_) => Some(DEF_POWER),
                Ok(v) => match v.parse::<u8>() {
                    Err(_) => Some(DEF_POWER),
                    Ok(v) => Some(v),
                },
            },
            Some(v) => Some(*v as u8),
        },
        url: match args.get_one::<String>("lora-e5-bridge.url") {
            None => match env::var("LORA_E5_BRIDGE_URL") {
                Err(_) => None,
                Ok(v) => Some(v),
            },
            Some(v) => Some(v.clone()),
        },
    })
}

/// Fill missing configurations with default values.
pub fn apply_default(config: &Config) -> Config {
    Config {
        dev_path: match config.dev_path.as_ref() {
            None => Some(DEF_DEV_PATH.to_string()),
            Some(path) => Some(path.clone()),
        },
        freq: match config.freq.as_ref() {
            None => Some(DEF_FREQ),
            Some(freq) => Some(freq.clone()),
        },
        sf: match config.sf.as_ref() {
            None => Some(DEF_SF),
            Some(sf) => Some(sf.clone()),
        },
        bw: match config.bw.as_ref() {
            None => Some(DEF_BW),
            Some(bw) => Some(bw.clone()),
        },
        power: match config.power.as_ref() {
            None => Some(DEF_POWER),
            Some(power) => Some(power.clone()),
        },
        url: match config.url.as_ref() {
            None => Some(DEF_URL.to_string()),
            Some(url) => Some(url.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_default_fills_missing_fields() {
        let conf = apply_default(&Config {
            ..Default::default()
        });
        assert_eq!(conf.dev_path, Some(DEF_DEV_PATH.to_string()));
        assert_eq!(conf.freq, Some(DEF_FREQ));
        assert_eq!(conf.sf, Some(DEF_SF));
        assert_eq!(conf.bw, Some(DEF_BW));
        assert_eq!(conf.power, Some(DEF_POWER));
        assert_eq!(conf.url, Some(DEF_URL.to_string()));
    }

    #[test]
    fn apply_default_keeps_provided_fields() {
        let conf = apply_default(&Config {
            dev_path: Some("COM13".to_string()),
            freq: Some(868),
            sf: Some(7),
            bw: Some(250),
            power: Some(10),
            url: Some("http://localhost:8080/readings.json".to_string()),
        });
        assert_eq!(conf.dev_path, Some("COM13".to_string()));
        assert_eq!(conf.freq, Some(868));
        assert_eq!(conf.sf, Some(7));
        assert_eq!(conf.bw, Some(250));
        assert_eq!(conf.power, Some(10));
        assert_eq!(conf.url, Some("http://localhost:8080/readings.json".to_string()));
    }

    #[test]
    fn config_file_keys_are_camel_case() {
        let conf: Config = json5::from_str(
            "{devPath:'/dev/ttyUSB1',freq:868,sf:7,bw:500,power:22,url:'http://example/db.json'}",
        )
        .unwrap();
        assert_eq!(conf.dev_path, Some("/dev/ttyUSB1".to_string()));
        assert_eq!(conf.freq, Some(868));
        assert_eq!(conf.sf, Some(7));
        assert_eq!(conf.bw, Some(500));
        assert_eq!(conf.power, Some(22));
        assert_eq!(conf.url, Some("http://example/db.json".to_string()));
    }
}
