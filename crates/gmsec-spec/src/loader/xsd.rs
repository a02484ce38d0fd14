//! Structured (XSD-derived) template dialect.
//!
//! A template document is an `xs:schema` carrying `api:` attributes and a
//! single top-level `xs:element` whose sequence lists the fields. Documents
//! without `api:id` are type libraries: they only contribute named
//! `xs:simpleType` blocks, reachable from other documents through
//! `xs:include`.
//!
//! ```xml
//! <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:api="urn:gmsec:api"
//!            api:id="MSG.LOG" api:level="0">
//!   <xs:include schemaLocation="C2MS.TYPES.xsd"/>
//!   <xs:element name="MESSAGE"><xs:complexType><xs:sequence>
//!     <xs:element name="SEVERITY" type="SEVERITY_TYPE"/>
//!     <xs:element name="MSG-TEXT" type="xs:string" minOccurs="0"/>
//!   </xs:sequence></xs:complexType></xs:element>
//! </xs:schema>
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use gmsec_core::{ContentPattern, FieldType, MessageKind};
use roxmltree::{Document, Node};

use super::{
    gmsec_type_list, gmsec_type_token, invalid_attr, parse_u32, parse_xml, push_unique,
    required_attr, split_list, split_subject, ParsedTemplate, TypeToken,
};
use crate::error::SchemaLoadError;
use crate::template::{FieldClass, FieldDependency, FieldMode, FieldTemplate, TemplateKind};

/// Namespace of the `api:` extension attributes.
pub const API_NS: &str = "urn:gmsec:api";

/// Simple types may derive from simple types; deeper chains are treated as
/// cycles.
const MAX_TYPE_DEPTH: usize = 16;

/// Parse every structured document, resolving simple types across includes.
pub(crate) fn parse_templates(files: &[(String, String)]) -> Result<Vec<ParsedTemplate>, SchemaLoadError> {
    let mut docs = Vec::with_capacity(files.len());
    for (name, text) in files {
        docs.push((name.as_str(), parse_xml(name, text)?));
    }
    let resolver = TypeResolver::new(&docs)?;

    let mut parsed = Vec::new();
    for (index, info) in resolver.docs.iter().enumerate() {
        let root = info.root;
        let Some(id) = api_attr(root, "id") else {
            continue;
        };
        let file = info.file;
        let id = id.trim().to_string();
        let level_raw = api_attr(root, "level").ok_or_else(|| SchemaLoadError::MissingAttribute {
            file: file.to_string(),
            element: "xs:schema".to_string(),
            attribute: "api:level".to_string(),
        })?;
        let level = parse_u32(file, root, "api:level", level_raw)?;
        let kind = match api_attr(root, "kind") {
            Some(k) => Some(MessageKind::from_token(k).ok_or_else(|| invalid_attr(file, root, "api:kind", k))?),
            None => None,
        };

        let message = xs_child(root, "element").ok_or_else(|| missing_tag(file, "xs:element"))?;
        let sequence = xs_child(message, "complexType")
            .and_then(|c| xs_child(c, "sequence"))
            .ok_or_else(|| missing_tag(file, "xs:sequence"))?;
        let default_class = if id == "HEADER" {
            FieldClass::Header
        } else {
            FieldClass::Standard
        };
        let fields = resolver.parse_sequence(index, sequence, "", default_class)?;

        parsed.push(ParsedTemplate {
            file: file.to_string(),
            id,
            level,
            kind,
            header: api_attr(root, "header").map(|h| h.trim().to_string()),
            subject: split_subject(api_attr(root, "subject").unwrap_or_default()),
            description: api_attr(root, "description").unwrap_or_default().trim().to_string(),
            fields,
        });
    }
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Type resolution
// ---------------------------------------------------------------------------

/// Types, values, and pattern a type reference resolves to.
#[derive(Debug, Default)]
struct ResolvedType {
    any: bool,
    types: Vec<FieldType>,
    values: Vec<String>,
    pattern: Option<ContentPattern>,
}

impl ResolvedType {
    fn any() -> Self {
        Self {
            any: true,
            ..Self::default()
        }
    }

    fn of(ty: FieldType) -> Self {
        Self {
            types: vec![ty],
            ..Self::default()
        }
    }

    fn field_types(&self) -> Vec<FieldType> {
        if self.any {
            Vec::new()
        } else {
            self.types.clone()
        }
    }
}

struct DocInfo<'a, 'i> {
    file: &'a str,
    root: Node<'a, 'i>,
    includes: Vec<usize>,
    simple_types: HashMap<&'a str, Node<'a, 'i>>,
}

struct TypeResolver<'a, 'i> {
    docs: Vec<DocInfo<'a, 'i>>,
}

impl<'a, 'i> TypeResolver<'a, 'i> {
    fn new(docs: &'a [(&'a str, Document<'i>)]) -> Result<Self, SchemaLoadError> {
        let by_file: HashMap<&str, usize> = docs
            .iter()
            .enumerate()
            .map(|(i, (file, _))| (*file, i))
            .collect();

        let mut infos = Vec::with_capacity(docs.len());
        for (file, doc) in docs {
            let file = *file;
            let root = doc.root_element();
            if root.tag_name().name() != "schema" {
                return Err(missing_tag(file, "xs:schema"));
            }
            let mut includes = Vec::new();
            let mut simple_types = HashMap::new();
            for node in root.children().filter(Node::is_element) {
                match node.tag_name().name() {
                    "include" => {
                        let location = required_attr(file, node, "schemaLocation")?;
                        let name = location.rsplit('/').next().unwrap_or(location);
                        let target = by_file.get(name).copied().ok_or_else(|| {
                            SchemaLoadError::DanglingReference {
                                file: file.to_string(),
                                reference: location.to_string(),
                            }
                        })?;
                        includes.push(target);
                    }
                    "simpleType" => {
                        let name = required_attr(file, node, "name")?;
                        simple_types.insert(name, node);
                    }
                    _ => {}
                }
            }
            infos.push(DocInfo {
                file,
                root,
                includes,
                simple_types,
            });
        }
        Ok(Self { docs: infos })
    }

    /// Named simple type visible from `doc`: its own, then includes
    /// transitively, breadth first.
    fn lookup(&self, doc: usize, name: &str) -> Option<(usize, Node<'a, 'i>)> {
        let mut queue = VecDeque::from([doc]);
        let mut seen = HashSet::new();
        while let Some(d) = queue.pop_front() {
            if !seen.insert(d) {
                continue;
            }
            if let Some(node) = self.docs[d].simple_types.get(name) {
                return Some((d, *node));
            }
            queue.extend(self.docs[d].includes.iter().copied());
        }
        None
    }

    fn unresolved(&self, doc: usize, reference: &str) -> SchemaLoadError {
        SchemaLoadError::UnresolvedType {
            file: self.docs[doc].file.to_string(),
            type_name: reference.to_string(),
        }
    }

    fn resolve_ref(&self, doc: usize, reference: &str, depth: usize) -> Result<ResolvedType, SchemaLoadError> {
        let reference = reference.trim();
        if depth > MAX_TYPE_DEPTH {
            return Err(self.unresolved(doc, reference));
        }
        let (prefix, local) = match reference.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, reference),
        };
        match prefix {
            Some("xs" | "xsd") => builtin(local).ok_or_else(|| self.unresolved(doc, reference)),
            Some("api") => match gmsec_type_token(local) {
                Some(TypeToken::Variable) => Ok(ResolvedType::any()),
                Some(TypeToken::Concrete(ty)) => Ok(ResolvedType::of(ty)),
                Some(TypeToken::Patterned(p)) => Ok(ResolvedType {
                    pattern: Some(p),
                    ..ResolvedType::of(FieldType::String)
                }),
                None => Err(self.unresolved(doc, reference)),
            },
            _ => {
                let (owner, node) = self
                    .lookup(doc, local)
                    .ok_or_else(|| self.unresolved(doc, reference))?;
                self.resolve_simple(owner, node, depth + 1)
            }
        }
    }

    fn resolve_simple(
        &self,
        doc: usize,
        node: Node<'a, 'i>,
        depth: usize,
    ) -> Result<ResolvedType, SchemaLoadError> {
        let file = self.docs[doc].file;
        let own_pattern = match api_attr(node, "pattern") {
            Some(p) => Some(ContentPattern::from_token(p).ok_or_else(|| invalid_attr(file, node, "api:pattern", p))?),
            None => None,
        };

        let mut resolved = if let Some(restriction) = xs_child(node, "restriction") {
            let base = required_attr(file, restriction, "base")?;
            let mut resolved = self.resolve_ref(doc, base, depth)?;
            let own: Vec<String> = restriction
                .children()
                .filter(|c| c.is_element() && c.tag_name().name() == "enumeration")
                .filter_map(|c| c.attribute("value"))
                .map(|v| v.trim().to_string())
                .collect();
            if !own.is_empty() {
                resolved.values = own;
            }
            resolved
        } else if let Some(union) = xs_child(node, "union") {
            let members = required_attr(file, union, "memberTypes")?;
            let mut resolved = ResolvedType::default();
            for member in members.split_whitespace() {
                let part = self.resolve_ref(doc, member, depth)?;
                resolved.any |= part.any;
                for ty in part.types {
                    push_unique(&mut resolved.types, ty);
                }
                resolved.values.extend(part.values);
                resolved.pattern = resolved.pattern.or(part.pattern);
            }
            resolved
        } else {
            return Err(missing_tag(file, "xs:restriction"));
        };

        if own_pattern.is_some() {
            resolved.pattern = own_pattern;
        }
        Ok(resolved)
    }

    // -----------------------------------------------------------------------
    // Fields
    // -----------------------------------------------------------------------

    fn parse_sequence(
        &self,
        doc: usize,
        sequence: Node<'a, 'i>,
        prefix: &str,
        class: FieldClass,
    ) -> Result<Vec<FieldTemplate>, SchemaLoadError> {
        sequence
            .children()
            .filter(|c| c.is_element() && c.tag_name().name() == "element")
            .map(|c| self.parse_element(doc, c, prefix, class))
            .collect()
    }

    fn parse_element(
        &self,
        doc: usize,
        node: Node<'a, 'i>,
        prefix: &str,
        default_class: FieldClass,
    ) -> Result<FieldTemplate, SchemaLoadError> {
        let file = self.docs[doc].file;
        let name = format!("{prefix}{}", required_attr(file, node, "name")?.trim());
        let optional = node.attribute("minOccurs").map(str::trim) == Some("0");
        let description = documentation(node);
        let class = match api_attr(node, "class") {
            None => default_class,
            Some(c) => FieldClass::from_token(c).ok_or_else(|| invalid_attr(file, node, "api:class", c))?,
        };

        if let Some(complex) = xs_child(node, "complexType") {
            let sequence = xs_child(complex, "sequence").ok_or_else(|| missing_tag(file, "xs:sequence"))?;
            let (kind, children) = match api_attr(node, "size") {
                Some(size) => {
                    let index = api_attr(node, "index").map_or("n", str::trim).to_string();
                    let child_prefix = format!("{name}.{index}.");
                    let children = self.parse_sequence(doc, sequence, &child_prefix, class)?;
                    let kind = TemplateKind::Array {
                        size_field: format!("{prefix}{}", size.trim()),
                        index,
                        optional,
                    };
                    (kind, children)
                }
                None => (
                    TemplateKind::Container { optional },
                    self.parse_sequence(doc, sequence, "", class)?,
                ),
            };
            return Ok(FieldTemplate {
                mode: FieldMode::Control,
                class,
                kind,
                description,
                children,
                ..FieldTemplate::new(name)
            });
        }

        let resolved = if let Some(type_ref) = node.attribute("type") {
            self.resolve_ref(doc, type_ref, 0)?
        } else if let Some(inline) = xs_child(node, "simpleType") {
            self.resolve_simple(doc, inline, 0)?
        } else {
            ResolvedType::any()
        };

        let values = match node.attribute("fixed") {
            Some(fixed) => vec![fixed.trim().to_string()],
            None => resolved.values.clone(),
        };
        let pattern = match api_attr(node, "pattern") {
            Some(p) => Some(ContentPattern::from_token(p).ok_or_else(|| invalid_attr(file, node, "api:pattern", p))?),
            None => resolved.pattern,
        };

        let mut dependencies = Vec::new();
        if let Some(trigger) = api_attr(node, "dependency") {
            let mode = match api_attr(node, "dependencyUse") {
                None => None,
                Some(m) => match FieldMode::from_token(m) {
                    Some(FieldMode::Control) | None => {
                        return Err(invalid_attr(file, node, "api:dependencyUse", m))
                    }
                    mode => mode,
                },
            };
            let types = match api_attr(node, "dependencyType") {
                None => None,
                Some(t) => Some(
                    gmsec_type_list(t)
                        .map_err(|bad| invalid_attr(file, node, "api:dependencyType", &bad))?
                        .0,
                ),
            };
            dependencies.push(FieldDependency {
                field: trigger.trim().to_string(),
                equals: api_attr(node, "dependencyValue").map(|v| v.trim().to_string()),
                mode,
                types,
                values: api_attr(node, "dependencyRestriction").map(split_list),
            });
        }

        Ok(FieldTemplate {
            mode: if optional {
                FieldMode::Optional
            } else {
                FieldMode::Required
            },
            class,
            types: resolved.field_types(),
            values,
            description,
            pattern,
            dependencies,
            ..FieldTemplate::new(name)
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn builtin(local: &str) -> Option<ResolvedType> {
    let ty = match local {
        "string" | "normalizedString" | "token" | "NMTOKEN" => FieldType::String,
        "boolean" => FieldType::Bool,
        "byte" => FieldType::I8,
        "short" => FieldType::I16,
        "int" | "integer" => FieldType::I32,
        "long" => FieldType::I64,
        "unsignedByte" => FieldType::U8,
        "unsignedShort" => FieldType::U16,
        "unsignedInt" => FieldType::U32,
        "unsignedLong" => FieldType::U64,
        "float" => FieldType::F32,
        "double" | "decimal" => FieldType::F64,
        "hexBinary" | "base64Binary" => FieldType::Binary,
        "anySimpleType" | "anyType" => return Some(ResolvedType::any()),
        _ => return None,
    };
    Some(ResolvedType::of(ty))
}

fn api_attr<'a>(node: Node<'a, '_>, local: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.namespace() == Some(API_NS) && a.name() == local)
        .map(|a| a.value())
}

fn xs_child<'a, 'i>(node: Node<'a, 'i>, local: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == local)
}

fn documentation(node: Node<'_, '_>) -> String {
    if let Some(d) = api_attr(node, "description") {
        return d.trim().to_string();
    }
    xs_child(node, "annotation")
        .and_then(|a| xs_child(a, "documentation"))
        .and_then(|d| d.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

fn missing_tag(file: &str, tag: &str) -> SchemaLoadError {
    SchemaLoadError::MissingTag {
        file: file.to_string(),
        tag: tag.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:api="urn:gmsec:api">
      <xs:simpleType name="SEVERITY_TYPE">
        <xs:restriction base="xs:short"><xs:enumeration value="1..4"/></xs:restriction>
      </xs:simpleType>
      <xs:simpleType name="NUMERIC_TYPE"><xs:union memberTypes="xs:short xs:unsignedShort"/></xs:simpleType>
      <xs:simpleType name="STAMP" api:pattern="TIME"><xs:restriction base="xs:string"/></xs:simpleType>
      <xs:simpleType name="LOOP_A"><xs:restriction base="LOOP_B"/></xs:simpleType>
      <xs:simpleType name="LOOP_B"><xs:restriction base="LOOP_A"/></xs:simpleType>
    </xs:schema>"#;

    fn log(field: &str) -> String {
        format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:api="urn:gmsec:api"
                api:id="MSG.LOG" api:level="0" api:subject="C2MS.MESSAGE-TYPE.FILL">
              <xs:include schemaLocation="C2MS.TYPES.xsd"/>
              <xs:element name="MESSAGE"><xs:complexType><xs:sequence>
                {field}
              </xs:sequence></xs:complexType></xs:element>
            </xs:schema>"#
        )
    }

    fn parse(field: &str) -> Result<Vec<ParsedTemplate>, SchemaLoadError> {
        parse_templates(&[
            ("C2MS.MSG.LOG.xsd".to_string(), log(field)),
            ("C2MS.TYPES.xsd".to_string(), TYPES.to_string()),
        ])
    }

    fn single(field: &str) -> FieldTemplate {
        let parsed = parse(field).unwrap();
        assert_eq!(parsed.len(), 1, "type library must not produce a template");
        parsed[0].fields[0].clone()
    }

    #[test]
    fn resolves_simple_types_across_includes() {
        let f = single(r#"<xs:element name="SEVERITY" type="SEVERITY_TYPE"/>"#);
        assert_eq!(f.types, vec![FieldType::I16]);
        assert_eq!(f.values, vec!["1..4"]);
        assert_eq!(f.mode, FieldMode::Required);
    }

    #[test]
    fn unions_and_patterns() {
        let f = single(r#"<xs:element name="N" type="NUMERIC_TYPE" minOccurs="0"/>"#);
        assert_eq!(f.types, vec![FieldType::I16, FieldType::U16]);
        assert_eq!(f.mode, FieldMode::Optional);

        let f = single(r#"<xs:element name="T" type="STAMP"/>"#);
        assert_eq!(f.pattern, Some(ContentPattern::Time));

        let f = single(r#"<xs:element name="V" type="api:VARIABLE"/>"#);
        assert!(f.is_variable());
    }

    #[test]
    fn fixed_value_and_inline_type() {
        let f = single(r#"<xs:element name="MESSAGE-TYPE" type="xs:string" fixed="MSG"/>"#);
        assert_eq!(f.values, vec!["MSG"]);

        let f = single(
            r#"<xs:element name="MODE"><xs:simpleType><xs:restriction base="xs:string">
                 <xs:enumeration value="A"/><xs:enumeration value="B"/>
               </xs:restriction></xs:simpleType></xs:element>"#,
        );
        assert_eq!(f.values, vec!["A", "B"]);
        assert_eq!(f.types, vec![FieldType::String]);
    }

    #[test]
    fn arrays_prefix_children() {
        let f = single(
            r#"<xs:element name="ARGUMENT" api:size="NUM-OF-ARGUMENTS" api:index="n" minOccurs="0">
                 <xs:complexType><xs:sequence>
                   <xs:element name="NAME" type="xs:string"/>
                 </xs:sequence></xs:complexType>
               </xs:element>"#,
        );
        assert_eq!(
            f.kind,
            TemplateKind::Array {
                size_field: "NUM-OF-ARGUMENTS".to_string(),
                index: "n".to_string(),
                optional: true,
            }
        );
        assert_eq!(f.children[0].name, "ARGUMENT.n.NAME");
    }

    #[test]
    fn dependency_attributes() {
        let f = single(
            r#"<xs:element name="RETURN-VALUE" type="xs:int" minOccurs="0"
                 api:dependency="RESPONSE-STATUS" api:dependencyValue="3" api:dependencyUse="REQUIRED"/>"#,
        );
        assert_eq!(f.dependencies.len(), 1);
        assert_eq!(f.dependencies[0].field, "RESPONSE-STATUS");
        assert_eq!(f.dependencies[0].mode, Some(FieldMode::Required));
    }

    #[test]
    fn unresolved_type_fails() {
        let err = parse(r#"<xs:element name="X" type="NO_SUCH_TYPE"/>"#).unwrap_err();
        assert!(matches!(err, SchemaLoadError::UnresolvedType { ref type_name, .. } if type_name == "NO_SUCH_TYPE"));
    }

    #[test]
    fn cyclic_type_fails() {
        let err = parse(r#"<xs:element name="X" type="LOOP_A"/>"#).unwrap_err();
        assert!(matches!(err, SchemaLoadError::UnresolvedType { .. }));
    }

    #[test]
    fn dangling_include_fails() {
        let err = parse_templates(&[("C2MS.MSG.LOG.xsd".to_string(), log(""))]).unwrap_err();
        assert!(matches!(err, SchemaLoadError::DanglingReference { ref reference, .. } if reference == "C2MS.TYPES.xsd"));
    }

    #[test]
    fn missing_level_attribute_fails() {
        let text = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:api="urn:gmsec:api" api:id="X"/>"#;
        let err = parse_templates(&[("X.xsd".to_string(), text.to_string())]).unwrap_err();
        assert!(matches!(err, SchemaLoadError::MissingAttribute { ref attribute, .. } if attribute == "api:level"));
    }
}
