//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading a statutory
//! configuration snapshot from a directory of YAML files.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::{EngineError, EngineResult};

use super::snapshot::ConfigSnapshot;
use super::types::{ContributionsFile, GroupsFile, MonthlySlabsFile, SnapshotSettings, TaxSlabsFile};

/// File holding the snapshot settings.
pub const SNAPSHOT_FILE: &str = "snapshot.yaml";
/// File holding income-tax schedules.
pub const TAX_SLABS_FILE: &str = "tax_slabs.yaml";
/// File holding PT and LWF slabs.
pub const MONTHLY_SLABS_FILE: &str = "monthly_slabs.yaml";
/// File holding PF and ESI schemes.
pub const CONTRIBUTIONS_FILE: &str = "contributions.yaml";
/// File holding statutory groups.
pub const GROUPS_FILE: &str = "groups.yaml";

/// The YAML text of a configuration, one string per file.
///
/// Used to build a snapshot from sources that are not on disk, such as
/// embedded defaults or a configuration service.
#[derive(Debug, Clone, Copy)]
pub struct ConfigSources<'a> {
    /// `snapshot.yaml` content.
    pub snapshot: &'a str,
    /// `tax_slabs.yaml` content.
    pub tax_slabs: &'a str,
    /// `monthly_slabs.yaml` content.
    pub monthly_slabs: &'a str,
    /// `contributions.yaml` content.
    pub contributions: &'a str,
    /// `groups.yaml` content.
    pub groups: &'a str,
}

/// Loads and provides access to a statutory configuration snapshot.
///
/// # Directory Structure
///
/// ```text
/// config/sample/
/// ├── snapshot.yaml       # version, fiscal_year_start_month, rounding, tie_break
/// ├── tax_slabs.yaml      # income-tax schedules per regime
/// ├── monthly_slabs.yaml  # PT and LWF slabs per state
/// ├── contributions.yaml  # PF and ESI schemes
/// └── groups.yaml         # PF/ESI/PT registration groups
/// ```
///
/// # Example
///
/// ```no_run
/// use statutory_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/sample").unwrap();
/// println!("Loaded configuration {}", loader.snapshot().version());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    snapshot: Arc<ConfigSnapshot>,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration directory (e.g., "./config/sample")
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any required file is missing
    /// - Any file contains invalid YAML
    /// - The configuration fails validation
    ///
    /// # Example
    ///
    /// ```no_run
    /// use statutory_engine::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::load("./config/sample")?;
    /// # Ok::<(), statutory_engine::error::EngineError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings = Self::load_yaml::<SnapshotSettings>(&path.join(SNAPSHOT_FILE))?;
        let tax_slabs = Self::load_yaml::<TaxSlabsFile>(&path.join(TAX_SLABS_FILE))?;
        let monthly_slabs = Self::load_yaml::<MonthlySlabsFile>(&path.join(MONTHLY_SLABS_FILE))?;
        let contributions = Self::load_yaml::<ContributionsFile>(&path.join(CONTRIBUTIONS_FILE))?;
        let groups = Self::load_yaml::<GroupsFile>(&path.join(GROUPS_FILE))?;

        info!(path = %path.display(), version = %settings.version, "Loading statutory configuration");

        let snapshot = ConfigSnapshot::new(
            settings,
            tax_slabs.tax_slabs,
            monthly_slabs.monthly_slabs,
            contributions.contributions,
            groups.groups,
        )?;

        Ok(Self {
            snapshot: Arc::new(snapshot),
        })
    }

    /// Builds configuration from in-memory YAML.
    ///
    /// Parse errors name the file the text stands in for, prefixed with
    /// `<inline>/`.
    pub fn from_sources(sources: ConfigSources<'_>) -> EngineResult<Self> {
        let settings = Self::parse_yaml::<SnapshotSettings>(SNAPSHOT_FILE, sources.snapshot)?;
        let tax_slabs = Self::parse_list_yaml::<TaxSlabsFile>(TAX_SLABS_FILE, sources.tax_slabs)?;
        let monthly_slabs =
            Self::parse_list_yaml::<MonthlySlabsFile>(MONTHLY_SLABS_FILE, sources.monthly_slabs)?;
        let contributions =
            Self::parse_list_yaml::<ContributionsFile>(CONTRIBUTIONS_FILE, sources.contributions)?;
        let groups = Self::parse_list_yaml::<GroupsFile>(GROUPS_FILE, sources.groups)?;

        let snapshot = ConfigSnapshot::new(
            settings,
            tax_slabs.tax_slabs,
            monthly_slabs.monthly_slabs,
            contributions.contributions,
            groups.groups,
        )?;

        Ok(Self {
            snapshot: Arc::new(snapshot),
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    fn parse_yaml<T: serde::de::DeserializeOwned>(file_name: &str, content: &str) -> EngineResult<T> {
        serde_yaml::from_str(content).map_err(|e| EngineError::ConfigParseError {
            path: format!("<inline>/{}", file_name),
            message: e.to_string(),
        })
    }

    /// Parses a record-list file, where an empty document means no records.
    fn parse_list_yaml<T: serde::de::DeserializeOwned + Default>(
        file_name: &str,
        content: &str,
    ) -> EngineResult<T> {
        // An empty document deserializes as unit, not as an empty struct.
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        Self::parse_yaml(file_name, content)
    }

    /// The loaded snapshot.
    pub fn snapshot(&self) -> &Arc<ConfigSnapshot> {
        &self.snapshot
    }

    /// A shared handle to the snapshot, for pinning into a payroll run.
    pub fn shared(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.snapshot)
    }
}
