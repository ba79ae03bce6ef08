pub mod burst;
pub mod curves;
pub mod gestures;
pub mod keymap;
pub mod models;
pub mod settings;
pub mod shaper;
