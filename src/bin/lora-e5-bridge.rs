use std::{error::Error as StdError, fs};

use clap::{Arg as ClapArg, Command};
use log::{error, info};
use serde::Deserialize;
use tokio::signal;

use lora_e5_bridge::libs::{self, bridge_task::Options, logger};

#[derive(Deserialize)]
struct AppConfig {
    log: logger::Config,
    #[serde(rename = "loraE5Bridge")]
    lora_e5_bridge: libs::config::Config,
}

const PROJ_NAME: &'static str = env!("CARGO_PKG_NAME");
const PROJ_VER: &'static str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> std::io::Result<()> {
    const FN_NAME: &'static str = "main";

    let conf = match init_config() {
        Err(e) => {
            logger::init(&logger::Config {
                ..Default::default()
            });
            error!("[{}] read config error: {}", FN_NAME, e);
            return Ok(());
        }
        Ok(conf) => conf,
    };

    logger::init(&conf.log);

    let conf = libs::config::apply_default(&conf.lora_e5_bridge);
    let dev_path = conf.dev_path.unwrap();
    let url = conf.url.unwrap();
    let opts = Options {
        dev_path: dev_path.clone(),
        freq: conf.freq.unwrap(),
        sf: conf.sf.unwrap(),
        bw: conf.bw.unwrap(),
        power: conf.power.unwrap(),
        url: url.clone(),
    };
    let _ = match libs::bridge_task::BridgeTask::new(opts).await {
        Err(e) => {
            error!("[{}] new task error: {}", FN_NAME, e);
            error!(
                "[{}] check the dongle connection on {} and make sure no other program is using the port",
                FN_NAME, dev_path
            );
            let ports = libs::lora_e5::available_port_names();
            match ports.len() {
                0 => error!("[{}] no serial ports detected", FN_NAME),
                _ => error!("[{}] detected serial ports: {}", FN_NAME, ports.join(", ")),
            }
            return Ok(());
        }
        Ok(task) => task,
    };
    info!(
        "[{}] listening for sensor data, uploading to {}",
        FN_NAME, url
    );

    if let Err(e) = signal::ctrl_c().await {
        error!("[{}] wait interrupt signal error: {}", FN_NAME, e);
        return Ok(());
    }
    info!("[{}] stopped by user", FN_NAME);
    Ok(())
}

fn init_config() -> Result<AppConfig, Box<dyn StdError>> {
    let mut args = Command::new(PROJ_NAME).version(PROJ_VER).arg(
        ClapArg::new("file")
            .short('f')
            .long("file")
            .help("config file")
            .num_args(1),
    );
    args = logger::reg_args(args);
    args = libs::config::reg_args(args);
    let args = args.get_matches();

    if let Some(v) = args.get_one::<String>("file") {
        let conf_str = fs::read_to_string(v)?;
        return Ok(json5::from_str(conf_str.as_str())?);
    }

    Ok(AppConfig {
        log: logger::read_args(&args),
        lora_e5_bridge: libs::config::read_args(&args),
    })
}
