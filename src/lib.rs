pub mod error;
pub mod config;
pub mod logger;
pub mod input_loader;
pub mod delay_manager;
pub mod browser;
pub mod checker;
pub mod formatter;
pub mod exporter;
pub mod orchestrator;

// Exporting types for convenience
pub use error::{CheckerError, Result};
pub use config::{CheckerConfig, ConfigArgs};
pub use input_loader::{ArtistUser, LoadedUsers};
pub use checker::{ProfileStatus, ProfileStatusMap, ProgressUpdate};
pub use formatter::DisplayResults;
pub use orchestrator::{BatchReport, Orchestrator};
