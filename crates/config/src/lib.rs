//! Bootstrap configuration for live code hosts.
//!
//! The hosting application supplies this record once at startup. It is
//! handed to the document registry by value and never changes afterwards.
//!
//! ```toml
//! lib-dirs = ["/bry-libs/"]
//! sync-max-once-every-ms = 1000
//! routing = "browser"
//! ```
//!
//! Every key is optional; missing keys fall back to [`BootstrapConfig::default`].

pub mod error;

use std::path::Path;
use std::time::Duration;

pub use error::{ConfigError, Result};
use serde::Deserialize;

/// Default interpreter library directory.
pub const DEFAULT_LIB_DIR: &str = "/bry-libs/";
/// Default minimum spacing between two persisted versions.
pub const DEFAULT_SYNC_MAX_ONCE_EVERY: Duration = Duration::from_millis(1000);

/// How the hosting application routes pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
	/// History-API paths.
	#[default]
	Browser,
	/// Fragment (`#/…`) paths.
	Hash,
}

/// Process-wide configuration read by documents during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
	/// Library search path handed to the interpreter.
	pub lib_dirs: Vec<String>,
	/// Minimum spacing between two throttled version saves.
	pub sync_max_once_every: Duration,
	/// Page routing mode of the host.
	pub routing: RoutingMode,
}

impl Default for BootstrapConfig {
	fn default() -> Self {
		Self {
			lib_dirs: vec![DEFAULT_LIB_DIR.to_string()],
			sync_max_once_every: DEFAULT_SYNC_MAX_ONCE_EVERY,
			routing: RoutingMode::default(),
		}
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
	lib_dirs: Option<Vec<String>>,
	sync_max_once_every_ms: Option<u64>,
	routing: Option<RoutingMode>,
}

impl BootstrapConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(content: &str) -> Result<Self> {
		let raw: RawConfig = toml::from_str(content)?;
		let defaults = Self::default();
		let config = Self {
			lib_dirs: raw.lib_dirs.unwrap_or(defaults.lib_dirs),
			sync_max_once_every: raw.sync_max_once_every_ms.map_or(defaults.sync_max_once_every, Duration::from_millis),
			routing: raw.routing.unwrap_or(defaults.routing),
		};
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses and validates a TOML file.
	pub fn load_from_path(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let config = Self::from_toml_str(&content)?;
		tracing::debug!(
			path = %path.display(),
			lib_dirs = config.lib_dirs.len(),
			sync_ms = config.sync_max_once_every.as_millis() as u64,
			routing = ?config.routing,
			"config.loaded"
		);
		Ok(config)
	}

	/// Checks the invariants documents rely on.
	pub fn validate(&self) -> Result<()> {
		if self.lib_dirs.is_empty() {
			return Err(ConfigError::EmptyLibDirs);
		}
		if let Some(index) = self.lib_dirs.iter().position(|dir| dir.trim().is_empty()) {
			return Err(ConfigError::BlankLibDir { index });
		}
		if self.sync_max_once_every.is_zero() {
			return Err(ConfigError::ZeroSyncInterval);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		assert_eq!(BootstrapConfig::from_toml_str("").unwrap(), BootstrapConfig::default());
	}

	#[test]
	fn parses_all_keys() {
		let config = BootstrapConfig::from_toml_str(
			r#"
			lib-dirs = ["/libs/", "/vendor/"]
			sync-max-once-every-ms = 250
			routing = "hash"
			"#,
		)
		.unwrap();

		assert_eq!(
			config,
			BootstrapConfig {
				lib_dirs: vec!["/libs/".into(), "/vendor/".into()],
				sync_max_once_every: Duration::from_millis(250),
				routing: RoutingMode::Hash,
			}
		);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = BootstrapConfig::from_toml_str("lib-dir = \"/x\"").unwrap_err();
		assert!(matches!(err, ConfigError::Toml(_)));
	}

	#[test]
	fn empty_lib_dirs_are_rejected() {
		let err = BootstrapConfig::from_toml_str("lib-dirs = []").unwrap_err();
		assert!(matches!(err, ConfigError::EmptyLibDirs));
	}

	#[test]
	fn blank_lib_dir_reports_index() {
		let err = BootstrapConfig::from_toml_str("lib-dirs = [\"/a\", \"  \"]").unwrap_err();
		assert!(matches!(err, ConfigError::BlankLibDir { index: 1 }));
	}

	#[test]
	fn zero_throttle_is_rejected() {
		let err = BootstrapConfig::from_toml_str("sync-max-once-every-ms = 0").unwrap_err();
		assert!(matches!(err, ConfigError::ZeroSyncInterval));
	}

	#[test]
	fn load_from_path_reads_file() {
		let dir = tempfile::tempdir().expect("temp dir should exist");
		let path = dir.path().join("livecode.toml");
		std::fs::write(&path, "routing = \"hash\"").expect("write should succeed");

		let config = BootstrapConfig::load_from_path(&path).unwrap();
		assert_eq!(config.routing, RoutingMode::Hash);
		assert_eq!(config.lib_dirs, vec![DEFAULT_LIB_DIR.to_string()]);
	}

	#[test]
	fn load_from_missing_path_reports_path() {
		let dir = tempfile::tempdir().expect("temp dir should exist");
		let path = dir.path().join("missing.toml");

		match BootstrapConfig::load_from_path(&path) {
			Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
			other => panic!("expected Io error, got {other:?}"),
		}
	}
}
