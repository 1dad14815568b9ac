//! Blueprint registry: a versioned catalog of template projects
//!
//! This module provides:
//! - The catalog data model ([`Blueprint`], [`Database`])
//! - Loading a catalog from a local file or HTTP(S) URL ([`load`])
//! - Persisting a catalog back to disk ([`save`])
//! - Name and version lookup

mod store;

pub use store::{load, load_with, save};

use crate::error::{Error, Result};
use crate::version::Version;
use serde::Serialize;

/// A named, versioned template project
///
/// Field order here is the on-disk key order written by [`save`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Blueprint {
    pub name: String,
    pub version: String,
    /// Source location identifier (VCS URL or local directory)
    pub repo: String,
    /// Sub-path within the source where the template tree lives
    pub path: String,
    /// Direct archive URL, empty when the blueprint has none
    pub download_url: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl Blueprint {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn parsed_version(&self) -> Result<Version> {
        Version::parse(&self.version)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// All blueprints loaded from one registry source, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Database {
    pub blueprints: Vec<Blueprint>,
}

impl Database {
    pub fn new(blueprints: Vec<Blueprint>) -> Self {
        Self { blueprints }
    }

    /// First blueprint whose name matches exactly (case-sensitive)
    pub fn find(&self, name: &str) -> Result<&Blueprint> {
        self.blueprints
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })
    }

    /// First blueprint with this name whose version parses to `version`
    pub fn find_version(&self, name: &str, version: &Version) -> Result<&Blueprint> {
        self.blueprints
            .iter()
            .filter(|b| b.name == name)
            .find(|b| b.parsed_version().is_ok_and(|v| &v == version))
            .ok_or_else(|| Error::NotFound {
                name: format!("{}@{}", name, version),
            })
    }

    /// Highest-versioned blueprint with this name; unparseable versions are skipped
    pub fn latest(&self, name: &str) -> Result<&Blueprint> {
        self.blueprints
            .iter()
            .filter(|b| b.name == name)
            .filter_map(|b| b.parsed_version().ok().map(|v| (v, b)))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, b)| b)
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })
    }

    /// Replace the first blueprint with the same name, or append a new one
    pub fn upsert(&mut self, blueprint: Blueprint) {
        match self.blueprints.iter_mut().find(|b| b.name == blueprint.name) {
            Some(existing) => *existing = blueprint,
            None => self.blueprints.push(blueprint),
        }
    }
}

/// Look up a blueprint by name in a database
pub fn find<'a>(db: &'a Database, name: &str) -> Result<&'a Blueprint> {
    db.find(name)
}
