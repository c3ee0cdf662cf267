//! CLI command handlers. Each command is in its own file.

mod checksum;
mod completions;
mod config;
mod decrypt;
mod info;
mod scan;
mod unpack;

pub use checksum::run_checksum;
pub use completions::{run_completions, run_man};
pub use config::{apply_update, run_config, ConfigUpdate};
pub use decrypt::{default_decrypt_output, run_decrypt};
pub use info::run_info;
pub use scan::{distinct_apis, run_scan, ScanArgs, StdoutMode};
pub use unpack::run_unpack;
