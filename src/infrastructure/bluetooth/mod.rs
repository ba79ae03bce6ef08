//! Relay link
//!
//! Everything between a shaped [`Command`](crate::domain::models::Command)
//! and the bytes handed to the BLE link layer.
//!
//! ## Architecture
//!
//! ```text
//!   Command ──▶ protocol::encode ──▶ SecureFramer ──▶ TransportSink (mouse/key)
//!
//!   firmware ──▶ OtaController ──────────────────────▶ TransportSink (ota)
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Opcodes, fixed command layouts, OTA messages, UUIDs
//! - [`framer`] - Per-message AES-128-CBC framing and the shared key slot
//! - [`transport`] - The sink trait and a line-oriented dump sink
//! - [`ota`] - Chunked firmware transfer state machine

pub mod framer;
pub mod ota;
pub mod protocol;
pub mod transport;

pub use framer::{EncryptionContext, KeyHandle, SecureFramer};
pub use ota::{OtaController, TransferPhase, TransferProgress};
pub use transport::{TransportError, TransportSink};
