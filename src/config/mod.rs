//! Configuration loading and management for the statutory deduction engine.
//!
//! This module loads tax schedules, PT/LWF slabs, PF/ESI schemes and
//! statutory groups from YAML files, validates them once, and indexes them
//! into an immutable [`ConfigSnapshot`].
//!
//! # Example
//!
//! ```no_run
//! use statutory_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/sample").unwrap();
//! println!("Loaded configuration: {}", config.snapshot().version());
//! ```

mod groups;
mod loader;
mod slabs;
mod snapshot;
mod types;

pub use groups::{GroupIndex, OrgDimension, StatutoryGroup};
pub use loader::{
    ConfigLoader, ConfigSources, CONTRIBUTIONS_FILE, GROUPS_FILE, MONTHLY_SLABS_FILE,
    SNAPSHOT_FILE, TAX_SLABS_FILE,
};
pub use slabs::{
    validate_windows, ContributionScheme, MonthlyAmounts, MonthlySlab, TaxRebate, TaxSlabSet,
    ValidityWindow, Versioned, WageBand,
};
pub use snapshot::ConfigSnapshot;
pub use types::{
    BracketDefinition, ContributionDefinition, ContributionsFile, GroupsFile,
    LEGACY_UNBOUNDED_SENTINEL, MonthlyAmountsDefinition, MonthlySlabDefinition,
    MonthlySlabsFile, SnapshotSettings, TaxSlabDefinition, TaxSlabsFile,
};
