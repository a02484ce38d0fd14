//! # Schema Loader
//!
//! Reads a schema tree for one specification version and builds
//! [`TemplateTables`].
//!
//! ## Load order
//!
//! 1. `DIRECTORY.xml` first: declared levels, per-level HEADER definitions,
//!    and Schema ID refinement entries.
//! 2. Every template file of the selected dialect (`.xml` legacy, `.xsd`
//!    structured), in sorted name order. The result does not depend on the
//!    order a source enumerates files: duplicate detection keys on the
//!    fully-qualified ID and shorthand conflicts compare schema levels.
//!
//! ## Header composition
//!
//! Each message template is composed as header fields followed by content
//! fields. A content field that redefines a header field replaces it in
//! place and stays HEADER class. The header is the one named by the
//! template (`HEADER` attribute), else the header of the template's own
//! level, else the `DEFAULT` header of the ceiling level.

pub mod legacy;
pub mod xsd;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gmsec_core::{ContentPattern, FieldType, MessageKind};
use roxmltree::{Document, Node};
use tracing::{debug, info, warn};

use crate::config::{SpecVersion, SpecificationConfig};
use crate::error::SchemaLoadError;
use crate::tables::{TemplateTables, DEFAULT_HEADER};
use crate::template::{FieldClass, FieldTemplate, LevelInfo, MessageTemplate, SchemaTemplate};

/// Name of the directory file inside a version directory.
pub const DIRECTORY_FILE: &str = "DIRECTORY.xml";

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// A readable collection of schema files for one version.
pub trait SchemaSource: Send + Sync {
    /// Human-readable origin for log lines.
    fn origin(&self) -> String;

    /// Names of the files available, in any order.
    fn file_names(&self) -> Result<Vec<String>, SchemaLoadError>;

    /// Contents of one file.
    fn read(&self, name: &str) -> Result<String, SchemaLoadError>;
}

/// Files in a filesystem directory, usually `<schema-path>/<version>`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Read files directly from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read files from the version directory under `schema_path`.
    pub fn for_version(schema_path: &Path, version: &SpecVersion) -> Self {
        Self::new(schema_path.join(version.as_str()))
    }

    /// Directory being read.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SchemaSource for DirectorySource {
    fn origin(&self) -> String {
        self.root.display().to_string()
    }

    fn file_names(&self) -> Result<Vec<String>, SchemaLoadError> {
        let io_err = |e: std::io::Error| SchemaLoadError::Io {
            file: self.origin(),
            reason: e.to_string(),
        };
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            if !entry.file_type().map_err(io_err)?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<String, SchemaLoadError> {
        fs::read_to_string(self.root.join(name)).map_err(|e| SchemaLoadError::Io {
            file: name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// An in-memory bundle of schema files. Enumeration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: Vec<(String, String)>,
}

impl MemorySource {
    /// Empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file, builder style.
    pub fn with_file(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    /// Add or replace a file.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        let text = text.into();
        match self.files.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = text,
            None => self.files.push((name, text)),
        }
    }
}

impl SchemaSource for MemorySource {
    fn origin(&self) -> String {
        "<memory>".to_string()
    }

    fn file_names(&self) -> Result<Vec<String>, SchemaLoadError> {
        Ok(self.files.iter().map(|(n, _)| n.clone()).collect())
    }

    fn read(&self, name: &str) -> Result<String, SchemaLoadError> {
        self.files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.clone())
            .ok_or_else(|| SchemaLoadError::Io {
                file: name.to_string(),
                reason: "no such file in bundle".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Parsed documents
// ---------------------------------------------------------------------------

/// One template document, before header composition.
#[derive(Debug, Clone)]
pub(crate) struct ParsedTemplate {
    pub file: String,
    pub id: String,
    pub level: u32,
    pub kind: Option<MessageKind>,
    pub header: Option<String>,
    pub subject: Vec<String>,
    pub description: String,
    pub fields: Vec<FieldTemplate>,
}

impl ParsedTemplate {
    pub fn is_header(&self) -> bool {
        self.id == "HEADER"
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Builds [`TemplateTables`] from a [`SchemaSource`].
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    version: SpecVersion,
    level: u32,
    legacy: bool,
}

impl SchemaLoader {
    /// Loader for `version`, up to schema level `level`, in the legacy
    /// (`.xml`) or structured (`.xsd`) dialect.
    pub fn new(version: SpecVersion, level: u32, legacy: bool) -> Self {
        Self {
            version,
            level,
            legacy,
        }
    }

    /// Loader matching a specification configuration.
    pub fn from_config(config: &SpecificationConfig) -> Self {
        Self::new(
            config.version.clone(),
            config.schema_level,
            config.legacy_schema_files,
        )
    }

    /// Load and assemble every table.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaLoadError`] found; nothing is returned
    /// partially built.
    pub fn load(&self, source: &dyn SchemaSource) -> Result<TemplateTables, SchemaLoadError> {
        let dir_text = source.read(DIRECTORY_FILE)?;
        let (levels, entries) = parse_directory(&dir_text)?;

        let max_level = levels
            .keys()
            .next_back()
            .copied()
            .ok_or_else(|| SchemaLoadError::MissingTag {
                file: DIRECTORY_FILE.to_string(),
                tag: "LEVEL".to_string(),
            })?;
        let ceiling = if self.level > max_level {
            warn!(
                requested = self.level,
                available = max_level,
                "schema level exceeds the levels declared in the directory; clamping"
            );
            max_level
        } else {
            self.level
        };

        for level in 0..=ceiling {
            if !levels.contains_key(&level) {
                return Err(SchemaLoadError::MissingLevel {
                    file: DIRECTORY_FILE.to_string(),
                    level,
                });
            }
            let headers = entries
                .iter()
                .filter(|e| e.level == level && e.is_header())
                .count();
            if headers != 1 {
                return Err(SchemaLoadError::MissingHeader {
                    file: DIRECTORY_FILE.to_string(),
                    level,
                });
            }
        }

        let extension = if self.legacy { ".xml" } else { ".xsd" };
        let mut names: Vec<String> = source
            .file_names()?
            .into_iter()
            .filter(|n| n.ends_with(extension) && n != DIRECTORY_FILE)
            .collect();
        names.sort();

        let mut files = Vec::with_capacity(names.len());
        for name in names {
            let text = source.read(&name)?;
            files.push((name, text));
        }

        let parsed = if self.legacy {
            files
                .iter()
                .map(|(name, text)| legacy::parse_template(name, text))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            xsd::parse_templates(&files)?
        };

        let tables = assemble(self.version.clone(), ceiling, levels, entries, parsed)?;
        info!(
            origin = %source.origin(),
            version = %tables.version,
            ceiling = tables.ceiling,
            templates = tables.by_fq.len(),
            shorthand = tables.by_short.len(),
            headers = tables.headers.len(),
            "schema templates loaded"
        );
        Ok(tables)
    }
}

fn assemble(
    version: SpecVersion,
    ceiling: u32,
    levels: BTreeMap<u32, LevelInfo>,
    entries: Vec<SchemaTemplate>,
    parsed: Vec<ParsedTemplate>,
) -> Result<TemplateTables, SchemaLoadError> {
    let levels: BTreeMap<u32, LevelInfo> = levels.into_iter().filter(|(n, _)| *n <= ceiling).collect();
    let directory: Vec<SchemaTemplate> = entries.into_iter().filter(|e| e.level <= ceiling).collect();

    let mut headers: BTreeMap<String, Arc<Vec<FieldTemplate>>> = BTreeMap::new();
    let mut messages = Vec::new();
    for p in parsed {
        if p.level > ceiling {
            debug!(file = %p.file, level = p.level, "skipping template above the schema level ceiling");
            continue;
        }
        let Some(level) = levels.get(&p.level) else {
            return Err(SchemaLoadError::DanglingReference {
                file: p.file,
                reference: format!("schema level {}", p.level),
            });
        };
        let level_name = level.name.clone();
        if p.is_header() {
            let key = format!("{level_name}.HEADER");
            let fields = p
                .fields
                .into_iter()
                .map(|mut f| {
                    f.class = FieldClass::Header;
                    f
                })
                .collect();
            if headers.insert(key.clone(), Arc::new(fields)).is_some() {
                return Err(SchemaLoadError::DuplicateSchemaId { file: p.file, id: key });
            }
        } else {
            messages.push((p, level_name));
        }
    }

    let ceiling_key = levels
        .get(&ceiling)
        .map(|l| format!("{}.HEADER", l.name))
        .unwrap_or_default();
    let default = headers
        .get(&ceiling_key)
        .cloned()
        .ok_or_else(|| SchemaLoadError::MissingHeader {
            file: DIRECTORY_FILE.to_string(),
            level: ceiling,
        })?;
    headers.insert(DEFAULT_HEADER.to_string(), default);

    let mut by_fq: BTreeMap<String, Arc<MessageTemplate>> = BTreeMap::new();
    let mut by_short: BTreeMap<String, Arc<MessageTemplate>> = BTreeMap::new();
    for (p, level_name) in messages {
        let header = match &p.header {
            Some(key) if headers.contains_key(key) => key.clone(),
            Some(key) => {
                return Err(SchemaLoadError::DanglingReference {
                    file: p.file,
                    reference: key.clone(),
                })
            }
            None => {
                let key = format!("{level_name}.HEADER");
                if headers.contains_key(&key) {
                    key
                } else {
                    debug!(file = %p.file, "no header at the template's level; using DEFAULT");
                    DEFAULT_HEADER.to_string()
                }
            }
        };
        let header_fields = headers.get(&header).map_or(&[][..], |h| h.as_slice());
        let fields = compose(header_fields, p.fields);

        let fq_id = format!("{}.{}.{}.{}", version.major(), version.minor(), level_name, p.id);
        let template = Arc::new(MessageTemplate {
            kind: p.kind.unwrap_or_else(|| infer_kind(&p.id)),
            schema_id: p.id.clone(),
            fq_id: fq_id.clone(),
            level: p.level,
            level_name,
            description: p.description,
            subject_elements: p.subject,
            header,
            fields,
        });

        if by_fq.insert(fq_id.clone(), Arc::clone(&template)).is_some() {
            return Err(SchemaLoadError::DuplicateSchemaId { file: p.file, id: fq_id });
        }
        match by_short.get(&p.id) {
            Some(existing) if existing.level >= template.level => {}
            _ => {
                by_short.insert(p.id, template);
            }
        }
    }

    Ok(TemplateTables {
        version,
        ceiling,
        levels,
        directory,
        headers,
        by_fq,
        by_short,
    })
}

/// Header fields followed by content fields; a content field naming a
/// header field replaces it in place.
fn compose(header: &[FieldTemplate], content: Vec<FieldTemplate>) -> Vec<FieldTemplate> {
    let mut fields = header.to_vec();
    for field in content {
        match fields
            .iter_mut()
            .find(|h| h.class == FieldClass::Header && h.name == field.name)
        {
            Some(slot) => {
                *slot = FieldTemplate {
                    class: FieldClass::Header,
                    ..field
                }
            }
            None => fields.push(field),
        }
    }
    fields
}

/// Kind implied by the leading segment of a shorthand ID.
pub(crate) fn infer_kind(id: &str) -> MessageKind {
    match id.split('.').next() {
        Some("REQ") => MessageKind::Request,
        Some("RESP") => MessageKind::Reply,
        _ => MessageKind::Publish,
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

type Directory = (BTreeMap<u32, LevelInfo>, Vec<SchemaTemplate>);

fn parse_directory(text: &str) -> Result<Directory, SchemaLoadError> {
    let file = DIRECTORY_FILE;
    let doc = parse_xml(file, text)?;
    let root = doc.root_element();
    if root.tag_name().name() != "DIRECTORY" {
        return Err(SchemaLoadError::MissingTag {
            file: file.to_string(),
            tag: "DIRECTORY".to_string(),
        });
    }

    let mut levels = BTreeMap::new();
    let mut entries: Vec<SchemaTemplate> = Vec::new();
    for node in root.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "LEVEL" => {
                let number = u32_attr(file, node, "NUMBER")?;
                let info = LevelInfo {
                    number,
                    name: required_attr(file, node, "NAME")?.trim().to_string(),
                    description: node.attribute("DESCRIPTION").unwrap_or_default().trim().to_string(),
                };
                if levels.insert(number, info).is_some() {
                    return Err(SchemaLoadError::InvalidAttribute {
                        file: file.to_string(),
                        element: "LEVEL".to_string(),
                        attribute: "NUMBER".to_string(),
                        value: number.to_string(),
                    });
                }
            }
            "SCHEMA" => {
                let entry = SchemaTemplate {
                    id: required_attr(file, node, "ID")?.trim().to_string(),
                    definitions: split_list(node.attribute("DEFINITION").unwrap_or_default()),
                    level: u32_attr(file, node, "LEVEL")?,
                    level_name: String::new(),
                    description: node.attribute("DESCRIPTION").unwrap_or_default().trim().to_string(),
                };
                if entries.iter().any(|e| e.id == entry.id && e.level == entry.level) {
                    return Err(SchemaLoadError::DuplicateSchemaId {
                        file: file.to_string(),
                        id: format!("{} at level {}", entry.id, entry.level),
                    });
                }
                entries.push(entry);
            }
            other => debug!(element = other, "ignoring unknown directory element"),
        }
    }

    for entry in &mut entries {
        let Some(level) = levels.get(&entry.level) else {
            return Err(SchemaLoadError::DanglingReference {
                file: file.to_string(),
                reference: format!("schema level {}", entry.level),
            });
        };
        entry.level_name = level.name.clone();
    }
    Ok((levels, entries))
}

// ---------------------------------------------------------------------------
// Shared markup helpers
// ---------------------------------------------------------------------------

pub(crate) fn parse_xml<'a>(file: &str, text: &'a str) -> Result<Document<'a>, SchemaLoadError> {
    Document::parse(text).map_err(|e| SchemaLoadError::Markup {
        file: file.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn required_attr<'a>(
    file: &str,
    node: Node<'a, '_>,
    attribute: &str,
) -> Result<&'a str, SchemaLoadError> {
    node.attribute(attribute)
        .ok_or_else(|| SchemaLoadError::MissingAttribute {
            file: file.to_string(),
            element: node.tag_name().name().to_string(),
            attribute: attribute.to_string(),
        })
}

pub(crate) fn u32_attr(file: &str, node: Node<'_, '_>, attribute: &str) -> Result<u32, SchemaLoadError> {
    let raw = required_attr(file, node, attribute)?;
    parse_u32(file, node, attribute, raw)
}

pub(crate) fn parse_u32(
    file: &str,
    node: Node<'_, '_>,
    attribute: &str,
    raw: &str,
) -> Result<u32, SchemaLoadError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| invalid_attr(file, node, attribute, raw))
}

pub(crate) fn invalid_attr(file: &str, node: Node<'_, '_>, attribute: &str, value: &str) -> SchemaLoadError {
    SchemaLoadError::InvalidAttribute {
        file: file.to_string(),
        element: node.tag_name().name().to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

/// Comma-separated list, trimmed, empty entries dropped.
pub(crate) fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Subject-element list: dot-separated tokens.
pub(crate) fn split_subject(text: &str) -> Vec<String> {
    text.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A resolved GMSEC type token.
pub(crate) enum TypeToken {
    /// Any type.
    Variable,
    /// Concrete type.
    Concrete(FieldType),
    /// STRING constrained by a content pattern.
    Patterned(ContentPattern),
}

pub(crate) fn gmsec_type_token(token: &str) -> Option<TypeToken> {
    let token = token.trim();
    if token.is_empty()
        || token.eq_ignore_ascii_case("VARIABLE")
        || token.eq_ignore_ascii_case("UNSET")
    {
        return Some(TypeToken::Variable);
    }
    if let Some(pattern) = ContentPattern::from_token(token) {
        return Some(TypeToken::Patterned(pattern));
    }
    FieldType::from_token(token).map(TypeToken::Concrete)
}

/// Fold a list of GMSEC type tokens into (types, pattern). Any VARIABLE
/// token makes the whole list unrestricted. `Err` carries the bad token.
pub(crate) fn gmsec_type_list(text: &str) -> Result<(Vec<FieldType>, Option<ContentPattern>), String> {
    let mut types = Vec::new();
    let mut pattern = None;
    let mut variable = false;
    for token in text.split(',') {
        match gmsec_type_token(token) {
            Some(TypeToken::Variable) => variable = true,
            Some(TypeToken::Concrete(ty)) => push_unique(&mut types, ty),
            Some(TypeToken::Patterned(p)) => {
                push_unique(&mut types, FieldType::String);
                pattern = Some(p);
            }
            None => return Err(token.trim().to_string()),
        }
    }
    if variable {
        types.clear();
    }
    Ok((types, pattern))
}

pub(crate) fn push_unique(types: &mut Vec<FieldType>, ty: FieldType) {
    if !types.contains(&ty) {
        types.push(ty);
    }
}
