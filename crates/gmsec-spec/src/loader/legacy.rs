//! Legacy XML template dialect.
//!
//! ```xml
//! <SCHEMA ID="REQ.DIR" LEVEL="0" SUBJECT="C2MS.DOMAIN1.MESSAGE-TYPE.FILL">
//!   <FIELD NAME="NUM-OF-ARGUMENTS" MODE="OPTIONAL" TYPE="U16"/>
//!   <CONTROL NAME="ARGUMENT" VALUE="ARRAY-START" SIZE="NUM-OF-ARGUMENTS" INDEX="n" MODE="OPTIONAL"/>
//!   <FIELD NAME="ARGUMENT.n.NAME" TYPE="STRING"/>
//!   <CONTROL NAME="ARGUMENT" VALUE="ARRAY-END"/>
//! </SCHEMA>
//! ```
//!
//! Array controls arrive as flat start/end pairs and are folded into a tree
//! here, so nothing downstream ever sees a marker.

use std::mem;

use gmsec_core::{ContentPattern, MessageKind};
use roxmltree::Node;

use super::{
    gmsec_type_list, invalid_attr, parse_u32, parse_xml, required_attr, split_list, split_subject,
    ParsedTemplate,
};
use crate::error::SchemaLoadError;
use crate::template::{FieldClass, FieldDependency, FieldMode, FieldTemplate, TemplateKind};

/// Parse one legacy template document.
pub(crate) fn parse_template(file: &str, text: &str) -> Result<ParsedTemplate, SchemaLoadError> {
    let doc = parse_xml(file, text)?;
    let root = doc.root_element();
    if root.tag_name().name() != "SCHEMA" {
        return Err(SchemaLoadError::MissingTag {
            file: file.to_string(),
            tag: "SCHEMA".to_string(),
        });
    }

    let id = required_attr(file, root, "ID")?.trim().to_string();
    let level = parse_u32(file, root, "LEVEL", required_attr(file, root, "LEVEL")?)?;
    let kind = match root.attribute("KIND") {
        Some(k) => Some(MessageKind::from_token(k).ok_or_else(|| invalid_attr(file, root, "KIND", k))?),
        None => None,
    };
    let default_class = if id == "HEADER" {
        FieldClass::Header
    } else {
        FieldClass::Standard
    };
    let fields = parse_field_list(file, root, default_class)?;

    Ok(ParsedTemplate {
        file: file.to_string(),
        id,
        level,
        kind,
        header: root.attribute("HEADER").map(|h| h.trim().to_string()),
        subject: split_subject(root.attribute("SUBJECT").unwrap_or_default()),
        description: root.attribute("DESCRIPTION").unwrap_or_default().trim().to_string(),
        fields,
    })
}

/// Fields of `parent`, with ARRAY-START/ARRAY-END runs folded into array
/// templates.
fn parse_field_list(
    file: &str,
    parent: Node<'_, '_>,
    default_class: FieldClass,
) -> Result<Vec<FieldTemplate>, SchemaLoadError> {
    let mut open: Vec<(FieldTemplate, Vec<FieldTemplate>)> = Vec::new();
    let mut current: Vec<FieldTemplate> = Vec::new();

    for node in parent.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "FIELD" => current.push(parse_field(file, node, default_class)?),
            "CONTAINER" => current.push(parse_container(file, node, default_class)?),
            "CONTROL" => {
                let name = required_attr(file, node, "NAME")?.trim().to_string();
                let marker = required_attr(file, node, "VALUE")?;
                match marker.trim() {
                    "ARRAY-START" => {
                        let array = array_start(file, node, name, default_class)?;
                        open.push((array, mem::take(&mut current)));
                    }
                    "ARRAY-END" => {
                        let Some((mut array, parent_list)) = open.pop() else {
                            return Err(SchemaLoadError::UnbalancedArray {
                                file: file.to_string(),
                                name,
                            });
                        };
                        if array.name != name {
                            return Err(SchemaLoadError::UnbalancedArray {
                                file: file.to_string(),
                                name: array.name,
                            });
                        }
                        array.children = mem::replace(&mut current, parent_list);
                        current.push(array);
                    }
                    other => return Err(invalid_attr(file, node, "VALUE", other)),
                }
            }
            _ => {}
        }
    }

    if let Some((array, _)) = open.pop() {
        return Err(SchemaLoadError::UnbalancedArray {
            file: file.to_string(),
            name: array.name,
        });
    }
    Ok(current)
}

fn array_start(
    file: &str,
    node: Node<'_, '_>,
    name: String,
    class: FieldClass,
) -> Result<FieldTemplate, SchemaLoadError> {
    let size_field = required_attr(file, node, "SIZE")?.trim().to_string();
    let index = node.attribute("INDEX").map_or("n", str::trim).to_string();
    Ok(FieldTemplate {
        mode: FieldMode::Control,
        class,
        kind: TemplateKind::Array {
            size_field,
            index,
            optional: control_is_optional(file, node)?,
        },
        description: node.attribute("DESCRIPTION").unwrap_or_default().trim().to_string(),
        ..FieldTemplate::new(name)
    })
}

fn parse_container(
    file: &str,
    node: Node<'_, '_>,
    class: FieldClass,
) -> Result<FieldTemplate, SchemaLoadError> {
    let name = required_attr(file, node, "NAME")?.trim().to_string();
    Ok(FieldTemplate {
        mode: FieldMode::Control,
        class,
        kind: TemplateKind::Container {
            optional: control_is_optional(file, node)?,
        },
        description: node.attribute("DESCRIPTION").unwrap_or_default().trim().to_string(),
        children: parse_field_list(file, node, class)?,
        ..FieldTemplate::new(name)
    })
}

/// Controls default to REQUIRED; `MODE="OPTIONAL"` lets the count be absent.
fn control_is_optional(file: &str, node: Node<'_, '_>) -> Result<bool, SchemaLoadError> {
    match node.attribute("MODE") {
        None => Ok(false),
        Some(m) => match FieldMode::from_token(m) {
            Some(FieldMode::Optional) => Ok(true),
            Some(_) => Ok(false),
            None => Err(invalid_attr(file, node, "MODE", m)),
        },
    }
}

fn parse_field(
    file: &str,
    node: Node<'_, '_>,
    default_class: FieldClass,
) -> Result<FieldTemplate, SchemaLoadError> {
    let name = required_attr(file, node, "NAME")?.trim().to_string();

    let mode = match node.attribute("MODE") {
        None => FieldMode::Required,
        Some(m) => match FieldMode::from_token(m) {
            Some(FieldMode::Control) | None => return Err(invalid_attr(file, node, "MODE", m)),
            Some(mode) => mode,
        },
    };
    let class = match node.attribute("FIELD_CLASS") {
        None => default_class,
        Some(c) => FieldClass::from_token(c).ok_or_else(|| invalid_attr(file, node, "FIELD_CLASS", c))?,
    };
    let (types, mut pattern) = match node.attribute("TYPE") {
        None => (Vec::new(), None),
        Some(t) => gmsec_type_list(t).map_err(|bad| invalid_attr(file, node, "TYPE", &bad))?,
    };
    if let Some(p) = node.attribute("PATTERN") {
        pattern = Some(ContentPattern::from_token(p).ok_or_else(|| invalid_attr(file, node, "PATTERN", p))?);
    }

    let mut values = split_list(node.attribute("VALUE").unwrap_or_default());
    let mut dependencies = Vec::new();
    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "VALUE" => {
                if let Some(text) = child.text().map(str::trim).filter(|t| !t.is_empty()) {
                    values.push(text.to_string());
                }
            }
            "DEPENDENCY" => dependencies.push(parse_dependency(file, child)?),
            _ => {}
        }
    }

    Ok(FieldTemplate {
        mode,
        class,
        types,
        values,
        description: node.attribute("DESCRIPTION").unwrap_or_default().trim().to_string(),
        pattern,
        dependencies,
        ..FieldTemplate::new(name)
    })
}

fn parse_dependency(file: &str, node: Node<'_, '_>) -> Result<FieldDependency, SchemaLoadError> {
    let mode = match node.attribute("MODE") {
        None => None,
        Some(m) => match FieldMode::from_token(m) {
            Some(FieldMode::Control) | None => return Err(invalid_attr(file, node, "MODE", m)),
            mode => mode,
        },
    };
    let types = match node.attribute("TYPE") {
        None => None,
        Some(t) => Some(gmsec_type_list(t).map_err(|bad| invalid_attr(file, node, "TYPE", &bad))?.0),
    };
    Ok(FieldDependency {
        field: required_attr(file, node, "NAME")?.trim().to_string(),
        equals: node.attribute("VALUE").map(|v| v.trim().to_string()),
        mode,
        types,
        values: node.attribute("RESTRICTION").map(split_list),
    })
}
