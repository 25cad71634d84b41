//! tap-dynamics core library: configuration, catalog, replication state, errors.
//!
//! - [`types`]: watermarks, replication state, records
//! - [`config`]: [`Config`] loading and validation
//! - [`catalog`]: Singer catalog and selection metadata
//! - [`state`]: atomic state file load / save
//! - [`error`]: [`ConfigError`], [`StateError`], [`CatalogError`]

pub mod catalog;
pub mod config;
pub mod error;
pub mod state;
pub mod types;

pub use catalog::{Catalog, CatalogEntry, MetadataEntry, MetadataMap, Schema};
pub use config::{Auth, Config};
pub use error::{CatalogError, ConfigError, StateError};
pub use types::{format_datetime, parse_datetime, Record, ReplicationState, Watermark};
