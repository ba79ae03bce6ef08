pub mod bluetooth;
pub mod cancel;
pub mod clipboard;
pub mod credentials;
pub mod logging;
