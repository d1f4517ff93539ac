//! Error types for bootstrap configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading bootstrap configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The interpreter library path list is empty.
	#[error("`lib-dirs` must name at least one library directory")]
	EmptyLibDirs,

	/// A library path entry is blank.
	#[error("`lib-dirs` entry {index} is blank")]
	BlankLibDir {
		/// Position of the blank entry.
		index: usize,
	},

	/// The sync throttle interval is zero.
	#[error("`sync-max-once-every-ms` must be greater than zero")]
	ZeroSyncInterval,
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
