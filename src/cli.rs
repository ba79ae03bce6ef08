// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hid-relay-bridge")]
#[command(author, version, about = "Host bridge for a BLE HID relay")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file (default: <config dir>/HidRelayBridge/settings.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read input events as JSON lines on stdin and write relay frames to stdout
    Run {
        /// Take the relay key from this environment variable instead of the key store
        #[arg(long, value_name = "VAR")]
        key_env: Option<String>,

        /// File whose contents are pasted on Ctrl+V Ctrl+V
        #[arg(long, value_name = "FILE")]
        clipboard_file: Option<PathBuf>,
    },

    /// Stream a firmware image over the OTA channel
    Flash {
        /// Firmware image
        firmware: PathBuf,
    },

    /// Manage the stored relay key
    Key {
        #[command(subcommand)]
        action: KeyCommand,
    },

    /// Show or change persisted settings
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum KeyCommand {
    /// Store a 16-character passphrase
    Set { passphrase: String },
    /// Remove the stored passphrase
    Clear,
    /// Report whether a valid key is stored
    Status,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective settings as JSON
    Show,
    /// Update pointer and scroll shaping
    Shaping {
        /// Pointer gain multiplier
        #[arg(long)]
        sensitivity: Option<f64>,
        /// Scroll remainder decay per 16 ms frame, in (0, 1]
        #[arg(long)]
        decay: Option<f64>,
        /// Scroll boost exponent
        #[arg(long)]
        boost: Option<f64>,
    },
}
