pub mod bridge_task;
pub mod config;
pub mod logger;
pub mod lora_e5;
pub mod uploader;
