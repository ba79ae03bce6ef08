//! Host-side bridge for a BLE HID relay.
//!
//! Host pointer, wheel, button and key events are shaped into compact relay
//! commands, sealed with a pre-shared AES key and written to a transport
//! sink. Firmware updates go through the same sink on the OTA channel.

pub mod bridge;
pub mod domain;
pub mod infrastructure;
