//! # Inspection Subcommands
//!
//! `list`, `describe`, and `create`: read-only views over a loaded
//! specification.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::Args;
use gmsec_spec::{FieldTemplate, MessageTemplate, Specification, TemplateKind};

/// Arguments for `gmsec describe`.
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Shorthand (MSG.LOG) or fully-qualified (2019.00.C2MS.MSG.LOG) ID.
    pub schema_id: String,

    /// Print the template as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `gmsec create`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Template to instantiate.
    pub schema_id: String,

    /// Field assignments as NAME=VALUE, coerced to the declared type.
    #[arg(short = 'f', long = "field", value_name = "NAME=VALUE")]
    pub fields: Vec<String>,
}

/// Print declared levels and every loaded template.
pub fn run_list(spec: &Specification) -> Result<u8> {
    let tables = spec.tables();
    println!("Specification {} (schema level {})", tables.version(), tables.ceiling());
    println!();
    for level in tables.levels() {
        println!("  level {} {:<8} {}", level.number, level.name, level.description);
    }
    println!();
    for fq_id in tables.fq_ids() {
        if let Some(template) = tables.template_fq(fq_id) {
            println!("  {:<32} {:<8} {}", fq_id, template.kind.as_str(), template.description);
        }
    }
    println!();
    println!("Total: {} templates", tables.len());
    Ok(0)
}

/// Print one template.
pub fn run_describe(args: &DescribeArgs, spec: &Specification) -> Result<u8> {
    let template = spec
        .template(&args.schema_id)
        .with_context(|| format!("no message template named {}", args.schema_id))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(template.as_ref())?);
    } else {
        print!("{}", render_template(&template));
    }
    Ok(0)
}

/// Create a template-bound message and print it as JSON.
pub fn run_create(args: &CreateArgs, spec: &Specification) -> Result<u8> {
    let mut message = spec.create_message(&args.schema_id)?;
    for pair in &args.fields {
        let (name, value) = pair
            .split_once('=')
            .with_context(|| format!("expected NAME=VALUE, got '{pair}'"))?;
        message
            .set_field_value(name.trim(), value)
            .with_context(|| format!("cannot set {name}"))?;
    }
    if let Ok(subject) = spec.build_subject(&message) {
        message.set_subject(subject);
    }
    println!("{}", message.to_json()?);
    Ok(0)
}

/// Human-readable field tree.
pub fn render_template(template: &MessageTemplate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", template.fq_id, template.kind);
    if !template.description.is_empty() {
        let _ = writeln!(out, "  {}", template.description);
    }
    if !template.subject_elements.is_empty() {
        let _ = writeln!(out, "  subject: {}", template.subject_elements.join("."));
    }
    let _ = writeln!(out, "  header:  {}", template.header);
    for field in &template.fields {
        render_field(&mut out, field, 1);
    }
    out
}

fn render_field(out: &mut String, field: &FieldTemplate, depth: usize) {
    let indent = "  ".repeat(depth);
    match &field.kind {
        TemplateKind::Field => {
            let _ = write!(
                out,
                "{indent}{:<36} {:<9} {:<8} {}",
                field.name,
                field.mode.as_str(),
                field.class.as_str(),
                field.type_list()
            );
            if !field.values.is_empty() {
                let _ = write!(out, " [{}]", field.values.join(", "));
            }
            if let Some(pattern) = field.pattern {
                let _ = write!(out, " <{pattern}>");
            }
            out.push('\n');
            for dep in &field.dependencies {
                let trigger = match &dep.equals {
                    Some(value) => format!("{} = {value}", dep.field),
                    None => format!("{} present", dep.field),
                };
                let mode = dep.mode.map_or_else(String::new, |m| format!(" -> {m}"));
                let _ = writeln!(out, "{indent}  when {trigger}{mode}");
            }
        }
        TemplateKind::Array {
            size_field,
            index,
            optional,
        } => {
            let presence = if *optional { "optional " } else { "" };
            let _ = writeln!(
                out,
                "{indent}{} {presence}array, count {size_field}, index {index}",
                field.name
            );
            for child in &field.children {
                render_field(out, child, depth + 1);
            }
        }
        TemplateKind::Container { optional } => {
            let presence = if *optional { "optional " } else { "" };
            let _ = writeln!(out, "{indent}{} {presence}container", field.name);
            for child in &field.children {
                render_field(out, child, depth + 1);
            }
        }
    }
}
