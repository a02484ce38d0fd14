//! # Template Tables
//!
//! The immutable product of one schema load. A `Specification` publishes a
//! `TemplateTables` snapshot behind an `Arc`; readers never observe a
//! partially-built table.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::SpecVersion;
use crate::template::{FieldTemplate, LevelInfo, MessageTemplate, SchemaTemplate};

/// Key under which the ceiling level's header is also stored.
pub const DEFAULT_HEADER: &str = "DEFAULT";

/// Loaded templates, directory, and headers for one version and ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTables {
    pub(crate) version: SpecVersion,
    pub(crate) ceiling: u32,
    pub(crate) levels: BTreeMap<u32, LevelInfo>,
    pub(crate) directory: Vec<SchemaTemplate>,
    pub(crate) headers: BTreeMap<String, Arc<Vec<FieldTemplate>>>,
    pub(crate) by_fq: BTreeMap<String, Arc<MessageTemplate>>,
    pub(crate) by_short: BTreeMap<String, Arc<MessageTemplate>>,
}

impl TemplateTables {
    /// Specification version.
    pub fn version(&self) -> &SpecVersion {
        &self.version
    }

    /// Effective schema level ceiling after clamping.
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Declared levels up to the ceiling.
    pub fn levels(&self) -> impl Iterator<Item = &LevelInfo> {
        self.levels.values()
    }

    /// Name of a level.
    pub fn level_name(&self, level: u32) -> Option<&str> {
        self.levels.get(&level).map(|l| l.name.as_str())
    }

    /// Directory entries up to the ceiling.
    pub fn directory(&self) -> &[SchemaTemplate] {
        &self.directory
    }

    /// Directory entry for `id` at exactly `level`.
    pub fn directory_entry(&self, id: &str, level: u32) -> Option<&SchemaTemplate> {
        self.directory.iter().find(|e| e.level == level && e.id == id)
    }

    /// The HEADER directory entry for `level`.
    pub fn header_schema(&self, level: u32) -> Option<&SchemaTemplate> {
        self.directory_entry("HEADER", level)
    }

    /// Header field list by key (`C2MS.HEADER`, `DEFAULT`, ...).
    pub fn header_fields(&self, key: &str) -> Option<&[FieldTemplate]> {
        self.headers.get(key).map(|h| h.as_slice())
    }

    /// Header keys in sorted order.
    pub fn header_keys(&self) -> impl Iterator<Item = &str> {
        self.headers.keys().map(String::as_str)
    }

    /// Fully-qualified ID for a shorthand `id` at `level`.
    pub fn qualify(&self, level: u32, id: &str) -> Option<String> {
        self.level_name(level).map(|name| {
            format!(
                "{}.{}.{}.{}",
                self.version.major(),
                self.version.minor(),
                name,
                id
            )
        })
    }

    /// Template by fully-qualified ID, falling back to the shorthand table.
    pub fn template(&self, id: &str) -> Option<&Arc<MessageTemplate>> {
        self.by_fq.get(id).or_else(|| self.by_short.get(id))
    }

    /// Template by fully-qualified ID only.
    pub fn template_fq(&self, fq_id: &str) -> Option<&Arc<MessageTemplate>> {
        self.by_fq.get(fq_id)
    }

    /// Shorthand IDs in sorted order.
    pub fn template_ids(&self) -> impl Iterator<Item = &str> {
        self.by_short.keys().map(String::as_str)
    }

    /// Fully-qualified IDs in sorted order.
    pub fn fq_ids(&self) -> impl Iterator<Item = &str> {
        self.by_fq.keys().map(String::as_str)
    }

    /// Number of distinct fully-qualified templates.
    pub fn len(&self) -> usize {
        self.by_fq.len()
    }

    /// True if no message template was loaded.
    pub fn is_empty(&self) -> bool {
        self.by_fq.is_empty()
    }
}
