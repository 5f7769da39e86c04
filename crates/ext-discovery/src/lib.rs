//! Extension validation, type detection, and plugin discovery
//!
//! Three tightly-related pieces live here: the per-kind validators (pure
//! checks over file content), the deterministic three-tier type detector,
//! and the discovery engine that turns a filesystem tree into namespaced
//! plugin component records.

pub mod detect;
pub mod error;
pub mod frontmatter;
pub mod manifest;
pub mod scan;
pub mod validators;

pub use detect::TypeDetector;
pub use error::{Error, Result};
pub use manifest::PluginManifest;
pub use scan::{ComponentInfo, DiscoveryEngine, PluginInfo, namespaced_id};
