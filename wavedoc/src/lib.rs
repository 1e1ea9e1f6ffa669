// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

mod document;
pub mod dump;
pub mod fallback;
mod normalize;
mod signals;
pub mod simple;
pub mod vcd;

use std::path::PathBuf;

/// Cargo.toml version of this library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifies which of the two parsers was used to load a file.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Strategy {
    /// The line based parser in [`vcd`].
    Primary,
    /// The third-party `vcd` crate, wrapped by [`fallback`].
    Fallback,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Primary => write!(f, "primary"),
            Strategy::Fallback => write!(f, "fallback"),
        }
    }
}

/// Where the VCD text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcdSource {
    Path(PathBuf),
    Content(String),
}

impl VcdSource {
    pub fn path<P: Into<PathBuf>>(path: P) -> Self {
        VcdSource::Path(path.into())
    }

    pub fn content<S: Into<String>>(content: S) -> Self {
        VcdSource::Content(content.into())
    }
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Stop parsing at `$enddefinitions`. No value changes are read.
    pub signals_only: bool,
    /// Only register variables whose full reference is in this list.
    /// The order of the list is used when dumping values.
    pub signal_filter: Option<Vec<String>>,
    /// Indicates that value changes should be kept in the signal records.
    /// They are parsed (and reported to observers) either way.
    pub store_changes: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            signals_only: false,
            signal_filter: None,
            store_changes: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WavedocError {
    #[error("failed to load with the {0} parser:\n{1}")]
    FailedToLoad(Strategy, String),
    /// Displays the message of the fallback parser, since it was the last one to run.
    #[error("{fallback}")]
    FallbackExhausted { primary: String, fallback: String },
    #[error("io error")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize document")]
    Json(#[from] serde_json::Error),
}

impl From<vcd::VcdParseError> for WavedocError {
    fn from(value: vcd::VcdParseError) -> Self {
        WavedocError::FailedToLoad(Strategy::Primary, value.to_string())
    }
}

impl From<fallback::FallbackError> for WavedocError {
    fn from(value: fallback::FallbackError) -> Self {
        WavedocError::FailedToLoad(Strategy::Fallback, value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WavedocError>;

pub use document::{Document, Leaves, Node, WaveEntry, GROUP_TYPE, ROOT_NAME};
pub use normalize::Normalize;
pub use signals::{Change, SignalRecord, SignalRef, Time};
pub use vcd::VcdData;
