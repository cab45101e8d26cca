//! Core vocabulary for the mediadex pipeline: unified errors, scan
//! configuration, and the catalogue data model shared by every crate.

pub mod config;
pub mod error;
pub mod media;

pub use config::{ScanConfig, ToolsConfig};
pub use error::{Error, Result};
pub use media::{
    DriveLink, IndexDocument, IndexMetadata, MediaKind, MediaMetadata, MediaRecord, MediaStats,
    Resolution, ScanSummary, Thumbnails,
};
