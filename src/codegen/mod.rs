//! Code generation for sheet records and their containers.
//!
//! ```text
//! ParsedSheet → resolve fields → tera templates → GeneratedSource → SafeCodeWriter
//! ```
//!
//! Output is deterministic: the same sheet and options always render to
//! byte-identical text, so regenerated files diff cleanly.

pub mod templates;
pub mod writer;

pub use writer::{SafeCodeWriter, WriteOutcome, compute_string_hash};

use convert_case::{Case, Casing};
use serde::Serialize;
use tera::{Context, Tera};

use crate::error::{GenerateError, SchemaError};
use crate::schema::{ParsedSheet, SheetMode, identifier};
use templates::{
    CONTAINER_TEMPLATE, CONTAINER_TEMPLATE_NAME, MODULE_INDEX_TEMPLATE,
    MODULE_INDEX_TEMPLATE_NAME, RECORD_TEMPLATE, RECORD_TEMPLATE_NAME,
};

/// Namespaces (crate-relative module paths) the generated types live under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodegenOptions {
    pub record_namespace: String,
    pub container_namespace: String,
}

impl CodegenOptions {
    pub fn validate(&self) -> Result<(), SchemaError> {
        validate_namespace(&self.record_namespace)?;
        validate_namespace(&self.container_namespace)
    }
}

/// One rendered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub type_name: String,
    pub full_name: String,
    pub file_name: String,
    pub contents: String,
}

impl GeneratedSource {
    pub fn content_hash(&self) -> String {
        compute_string_hash(&self.contents)
    }

    pub fn module_name(&self) -> &str {
        self.file_name.trim_end_matches(".rs")
    }
}

#[derive(Debug, Serialize)]
struct FieldContext {
    member: String,
    rust_type: String,
    default: String,
    doc: String,
}

/// Renders record and container declarations.
pub struct CodeGenerator {
    tera: Tera,
}

impl CodeGenerator {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (RECORD_TEMPLATE_NAME, RECORD_TEMPLATE),
            (CONTAINER_TEMPLATE_NAME, CONTAINER_TEMPLATE),
            (MODULE_INDEX_TEMPLATE_NAME, MODULE_INDEX_TEMPLATE),
        ])?;
        Ok(Self { tera })
    }

    /// Render the plain data record for a sheet: one public member per field,
    /// in schema order, with an explicit `Default` built from each field's
    /// default literal.
    pub fn generate_record(
        &self,
        sheet: &ParsedSheet,
        options: &CodegenOptions,
    ) -> Result<GeneratedSource, GenerateError> {
        options.validate()?;
        let type_name = identifier::normalize_type_name(&sheet.sheet_name)?;
        let fields = sheet.schema.resolve()?;
        if fields.is_empty() {
            return Err(GenerateError::EmptySchema {
                sheet: sheet.sheet_name.clone(),
            });
        }

        let uses_pair = fields.iter().any(|field| field.descriptor.declares_pair());
        let mut runtime_imports = Vec::new();
        if uses_pair {
            runtime_imports.push("Pair");
        }
        runtime_imports.push("SheetRecord");

        let field_contexts: Vec<FieldContext> = fields
            .iter()
            .map(|field| FieldContext {
                member: field.member.clone(),
                rust_type: field.descriptor.render(),
                default: field.descriptor.default_literal(),
                doc: comment_text(&format!("{} ({})", field.name, field.descriptor)),
            })
            .collect();

        let full_name = full_type_name(&options.record_namespace, &type_name);
        let mut context = Context::new();
        context.insert("sheet_name", &comment_text(&sheet.sheet_name));
        context.insert("type_name", &type_name);
        context.insert("full_name", &full_name);
        context.insert("runtime_imports", &runtime_imports);
        context.insert("fields", &field_contexts);

        let contents = self.tera.render(RECORD_TEMPLATE_NAME, &context)?;
        Ok(GeneratedSource {
            file_name: source_file_name(&type_name),
            type_name,
            full_name,
            contents,
        })
    }

    /// Render the container for an already generated record. The container
    /// name is the pluralized record name.
    pub fn generate_container(
        &self,
        sheet: &ParsedSheet,
        record: &GeneratedSource,
        options: &CodegenOptions,
    ) -> Result<GeneratedSource, GenerateError> {
        options.validate()?;
        let type_name = identifier::pluralize(&record.type_name);
        let full_name = full_type_name(&options.container_namespace, &type_name);
        let capability = match sheet.mode {
            SheetMode::Table => "TableContainer",
            SheetMode::Const => "ConstContainer",
        };

        let mut context = Context::new();
        context.insert("sheet_name", &comment_text(&sheet.sheet_name));
        context.insert("type_name", &type_name);
        context.insert("full_name", &full_name);
        context.insert("record_name", &record.type_name);
        context.insert("record_path", &format!("crate::{}", record.full_name));
        context.insert("capability", capability);
        context.insert("is_table", &(sheet.mode == SheetMode::Table));

        let contents = self.tera.render(CONTAINER_TEMPLATE_NAME, &context)?;
        Ok(GeneratedSource {
            file_name: source_file_name(&type_name),
            type_name,
            full_name,
            contents,
        })
    }

    /// Render a `mod.rs` declaring and re-exporting the given modules.
    pub fn generate_module_index(&self, modules: &[String]) -> Result<String, GenerateError> {
        let mut modules = modules.to_vec();
        modules.sort();
        modules.dedup();

        let mut context = Context::new();
        context.insert("modules", &modules);
        Ok(self.tera.render(MODULE_INDEX_TEMPLATE_NAME, &context)?)
    }
}

/// `namespace::Name`, or just `Name` without a namespace.
pub fn full_type_name(namespace: &str, type_name: &str) -> String {
    let namespace = namespace.trim().trim_matches(':');
    if namespace.is_empty() {
        type_name.to_string()
    } else {
        format!("{namespace}::{type_name}")
    }
}

/// File name for a generated type, e.g. `MonsterStats` → `monster_stats.rs`.
pub fn source_file_name(type_name: &str) -> String {
    let stem = type_name.trim_start_matches('_').to_case(Case::Snake);
    format!("{stem}.rs")
}

fn validate_namespace(namespace: &str) -> Result<(), SchemaError> {
    let trimmed = namespace.trim().trim_matches(':');
    if trimmed.is_empty() {
        return Ok(());
    }
    for segment in trimmed.split("::") {
        let valid = !segment.is_empty()
            && !segment.starts_with(|ch: char| ch.is_ascii_digit())
            && segment.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if !valid {
            return Err(SchemaError::InvalidNamespace {
                namespace: namespace.to_string(),
                segment: segment.to_string(),
            });
        }
    }
    Ok(())
}

/// Collapse whitespace so arbitrary cell text is safe inside a line comment.
fn comment_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
