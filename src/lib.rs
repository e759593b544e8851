//! A simple LoRa-to-cloud bridge. Sensor packets received by a Seeed LoRa-E5 USB dongle in
//! packet-test mode are decoded into JSON readings and uploaded to a Firebase Realtime Database.

pub mod libs;
