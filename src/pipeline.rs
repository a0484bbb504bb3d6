//! End-to-end generation for one sheet.
//!
//! ```text
//! fetch → parse → render record/container → write sources → build payload
//!       → enqueue job → update registry
//! ```
//!
//! Everything that can fail because of the sheet itself fails before any file
//! is written or any job is enqueued.

use chrono::Utc;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Instrument;

use crate::codegen::{CodeGenerator, GeneratedSource, SafeCodeWriter, WriteOutcome};
use crate::config::ForgeConfig;
use crate::error::{GenerateError, SchemaError, StoreError};
use crate::jobs::{GenerationJob, JobRequest, JobStore};
use crate::logging;
use crate::registry::{AssetRegistry, AssetRegistryEntry, SchemaDiff};
use crate::schema::{CellGrid, ParsedSheet, SheetMode, parse_sheet};
use crate::source::SheetSource;
use crate::values;

const MODULE_INDEX_FILE: &str = "mod.rs";

/// Which sheet to generate and how to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub mode: SheetMode,
}

/// Rendered output for a sheet, before anything touches the disk.
#[derive(Debug, Clone)]
pub struct PreparedSheet {
    pub sheet: ParsedSheet,
    pub record: GeneratedSource,
    pub container: GeneratedSource,
    pub document: Value,
}

#[derive(Debug)]
pub struct GenerationReport {
    pub record: GeneratedSource,
    pub container: GeneratedSource,
    pub record_path: PathBuf,
    pub container_path: PathBuf,
    pub record_write: WriteOutcome,
    pub container_write: WriteOutcome,
    pub job: GenerationJob,
    /// Drift against the previously registered schema, if there was one.
    pub schema_diff: Option<SchemaDiff>,
}

pub struct GenerationPipeline {
    config: ForgeConfig,
    generator: CodeGenerator,
    writer: SafeCodeWriter,
}

impl GenerationPipeline {
    pub fn new(config: ForgeConfig) -> Result<Self, GenerateError> {
        let generator = CodeGenerator::new()?;
        let writer = SafeCodeWriter::new(&config.project_root);
        Ok(Self {
            config,
            generator,
            writer,
        })
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Parse a grid and render everything for it. Pure: touches no files.
    pub fn prepare(&self, request: &GenerateRequest, grid: &CellGrid) -> Result<PreparedSheet, GenerateError> {
        let sheet = parse_sheet(&request.sheet_name, grid, request.mode);
        let options = self.config.codegen_options();
        let record = self.generator.generate_record(&sheet, &options)?;
        let container = self.generator.generate_container(&sheet, &record, &options)?;
        let document = values::generate_value(&sheet)?;
        Ok(PreparedSheet {
            sheet,
            record,
            container,
            document,
        })
    }

    /// Fetch a sheet and run the whole pipeline for it.
    pub async fn generate(
        &self,
        source: &dyn SheetSource,
        request: &GenerateRequest,
        jobs: &mut dyn JobStore,
        registry: &mut AssetRegistry,
    ) -> Result<GenerationReport, GenerateError> {
        let span = logging::generation_span(&request.spreadsheet_id, &request.sheet_name);
        let grid = source
            .fetch(&request.spreadsheet_id, &request.sheet_name)
            .instrument(span.clone())
            .await?;
        let _entered = span.enter();
        self.generate_from_grid(request, &grid, jobs, registry)
    }

    /// Run the pipeline on an already fetched grid.
    pub fn generate_from_grid(
        &self,
        request: &GenerateRequest,
        grid: &CellGrid,
        jobs: &mut dyn JobStore,
        registry: &mut AssetRegistry,
    ) -> Result<GenerationReport, GenerateError> {
        let prepared = self.prepare(request, grid)?;
        let PreparedSheet {
            sheet,
            record,
            container,
            document,
        } = prepared;

        let record_path = self.config.script_output.join(&record.file_name);
        let container_path = self
            .config
            .container_script_output
            .join(&container.file_name);
        check_collisions(
            registry,
            request,
            [(&record.full_name, &record_path), (&container.full_name, &container_path)],
        )?;
        let record_write = self.writer.write(&record_path, &record.contents)?;
        let container_write = self.writer.write(&container_path, &container.contents)?;
        self.write_module_index(&self.config.script_output)?;
        if self.config.container_script_output != self.config.script_output {
            self.write_module_index(&self.config.container_script_output)?;
        }
        tracing::info!(
            record = %record.full_name,
            container = %container.full_name,
            record_changed = record_write.changed(),
            container_changed = container_write.changed(),
            "wrote generated sources"
        );

        let asset_path = self.config.asset_path_for(&container.type_name);
        let job = jobs.enqueue(JobRequest {
            sheet_id: request.spreadsheet_id.clone(),
            sheet_name: request.sheet_name.clone(),
            record_type: record.full_name.clone(),
            container_type: container.full_name.clone(),
            asset_path: asset_path.clone(),
            payload: values::to_payload(&document),
            mode: request.mode,
        })?;

        let schema_diff = registry
            .find(&request.spreadsheet_id, &request.sheet_name)
            .map(|previous| SchemaDiff::between(&previous.last_schema(), &sheet.schema));
        if let Some(diff) = schema_diff.as_ref().filter(|diff| !diff.is_empty()) {
            tracing::warn!(
                added = ?diff.added,
                removed = ?diff.removed,
                retyped = diff.retyped.len(),
                "sheet schema changed since the last generation"
            );
        }

        registry.upsert(AssetRegistryEntry {
            sheet_id: request.spreadsheet_id.clone(),
            sheet_name: request.sheet_name.clone(),
            mode: request.mode,
            record_name: record.type_name.clone(),
            container_name: container.type_name.clone(),
            record_full_name: record.full_name.clone(),
            container_full_name: container.full_name.clone(),
            record_namespace: self.config.record_namespace.clone(),
            container_namespace: self.config.container_namespace.clone(),
            script_output_path: self.config.script_output.clone(),
            container_script_output_path: self.config.container_script_output.clone(),
            asset_path,
            last_synced: Utc::now(),
            last_field_names: sheet.schema.field_names.clone(),
            last_field_types: sheet.schema.field_types.clone(),
        })?;

        Ok(GenerationReport {
            record,
            container,
            record_path,
            container_path,
            record_write,
            container_write,
            job,
            schema_diff,
        })
    }

    /// Regenerate `mod.rs` in an output directory from the `.rs` files in it.
    fn write_module_index(&self, relative_dir: &Path) -> Result<WriteOutcome, GenerateError> {
        let dir = self.config.resolve_path(relative_dir);
        let mut modules = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|err| StoreError::io(&dir, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io(&dir, err))?;
            let path = entry.path();
            let is_module = path.extension().and_then(|ext| ext.to_str()) == Some("rs")
                && path.file_name().and_then(|name| name.to_str()) != Some(MODULE_INDEX_FILE);
            if !is_module {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                modules.push(stem.to_string());
            }
        }

        let index = self.generator.generate_module_index(&modules)?;
        Ok(self
            .writer
            .write_module_index(&relative_dir.join(MODULE_INDEX_FILE), &index)?)
    }
}

/// Refuse to write a type or file that another registered sheet owns, e.g.
/// the record of sheet `Items` and the container of sheet `Item`.
fn check_collisions(
    registry: &AssetRegistry,
    request: &GenerateRequest,
    outputs: [(&String, &PathBuf); 2],
) -> Result<(), SchemaError> {
    let others = registry
        .entries()
        .iter()
        .filter(|entry| !entry.matches(&request.spreadsheet_id, &request.sheet_name));
    for entry in others {
        let files = entry.generated_files();
        let types = entry.generated_types();
        for (full_name, path) in outputs {
            let existing = types
                .iter()
                .find(|existing| **existing == full_name.as_str())
                .map(|existing| existing.to_string())
                .or_else(|| {
                    files
                        .iter()
                        .find(|file| *file == path)
                        .map(|file| file.display().to_string())
                });
            if let Some(existing) = existing {
                return Err(SchemaError::GeneratedNameCollision {
                    generated: full_name.clone(),
                    existing,
                    sheet: request.sheet_name.clone(),
                    other_sheet: entry.sheet_name.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingsArgs;
    use crate::jobs::MemoryJobStore;
    use crate::source::GridSource;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn pipeline(root: &Path) -> GenerationPipeline {
        let config = ForgeConfig::from_settings(SettingsArgs {
            project_root: Some(root.to_path_buf()),
            record_namespace: Some("data".into()),
            script_output: Some(PathBuf::from("src/data")),
            ..SettingsArgs::default()
        })
        .unwrap();
        GenerationPipeline::new(config).unwrap()
    }

    fn monster_grid() -> CellGrid {
        CellGrid::from_rows(vec![
            vec!["int", "string", "string[]"],
            vec!["hp", "name", "tag"],
            vec!["10", "Slime", "weak,small"],
        ])
    }

    fn request() -> GenerateRequest {
        GenerateRequest {
            spreadsheet_id: "book".into(),
            sheet_name: "Monster".into(),
            mode: SheetMode::Table,
        }
    }

    #[tokio::test]
    async fn generate_writes_sources_and_enqueues_job() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path());
        let source = GridSource::new().with_sheet("book", "Monster", monster_grid());
        let mut jobs = MemoryJobStore::new();
        let mut registry = AssetRegistry::load(dir.path().join("registry.json")).unwrap();

        let report = pipeline
            .generate(&source, &request(), &mut jobs, &mut registry)
            .await
            .unwrap();

        assert_eq!(report.record_write, WriteOutcome::Created);
        assert!(dir.path().join("src/data/monster.rs").exists());
        assert!(dir.path().join("src/data/monsters.rs").exists());
        let index = fs::read_to_string(dir.path().join("src/data/mod.rs")).unwrap();
        assert!(index.contains("mod monster;") && index.contains("mod monsters;"));

        let stored = jobs.read_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].container_type(), "data::Monsters");
        assert_eq!(stored[0].asset_path(), "assets/Monsters.asset");
        let payload: Value = serde_json::from_str(stored[0].payload()).unwrap();
        assert_eq!(payload[0]["Tags"], serde_json::json!(["weak", "small"]));

        assert!(report.schema_diff.is_none());
        assert_eq!(registry.entries().len(), 1);
    }

    #[test]
    fn regeneration_reports_schema_drift_and_skips_unchanged_files() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path());
        let mut jobs = MemoryJobStore::new();
        let mut registry = AssetRegistry::load(dir.path().join("registry.json")).unwrap();

        pipeline
            .generate_from_grid(&request(), &monster_grid(), &mut jobs, &mut registry)
            .unwrap();
        let again = pipeline
            .generate_from_grid(&request(), &monster_grid(), &mut jobs, &mut registry)
            .unwrap();
        assert_eq!(again.record_write, WriteOutcome::Unchanged);
        assert!(again.schema_diff.unwrap().is_empty());

        let changed = CellGrid::from_rows(vec![vec!["int", "float"], vec!["hp", "speed"], vec!["1", "2"]]);
        let report = pipeline
            .generate_from_grid(&request(), &changed, &mut jobs, &mut registry)
            .unwrap();
        let diff = report.schema_diff.unwrap();
        assert_eq!(diff.added, vec!["speed"]);
        assert_eq!(diff.removed, vec!["name", "tag"]);
        assert_eq!(report.record_write, WriteOutcome::Updated);
        assert_eq!(jobs.read_all().unwrap().len(), 3);
    }

    #[test]
    fn schema_errors_stop_before_any_side_effect() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path());
        let mut jobs = MemoryJobStore::new();
        let mut registry = AssetRegistry::load(dir.path().join("registry.json")).unwrap();
        let grid = CellGrid::from_rows(vec![vec!["int", "int"], vec!["hp", "h-p"]]);

        assert_matches!(
            pipeline.generate_from_grid(&request(), &grid, &mut jobs, &mut registry),
            Err(GenerateError::Schema(_))
        );
        assert!(!dir.path().join("src/data").exists());
        assert!(!jobs.has_jobs().unwrap());
        assert!(registry.entries().is_empty());
    }

    #[test]
    fn colliding_generated_names_are_refused() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path());
        let mut jobs = MemoryJobStore::new();
        let mut registry = AssetRegistry::load(dir.path().join("registry.json")).unwrap();
        let item = GenerateRequest {
            spreadsheet_id: "book".into(),
            sheet_name: "Item".into(),
            mode: SheetMode::Table,
        };
        let items = GenerateRequest {
            sheet_name: "Items".into(),
            ..item.clone()
        };
        let grid = CellGrid::from_rows(vec![vec!["int"], vec!["weight"], vec!["3"]]);

        pipeline
            .generate_from_grid(&item, &grid, &mut jobs, &mut registry)
            .unwrap();
        let container_file = dir.path().join("src/data/items.rs");
        let before = fs::read_to_string(&container_file).unwrap();

        assert_matches!(
            pipeline.generate_from_grid(&items, &grid, &mut jobs, &mut registry),
            Err(GenerateError::Schema(SchemaError::GeneratedNameCollision { ref generated, ref other_sheet, .. }))
                if generated == "data::Items" && other_sheet == "Item"
        );
        assert_eq!(fs::read_to_string(&container_file).unwrap(), before);
        assert_eq!(jobs.read_all().unwrap().len(), 1);
        assert_eq!(registry.entries().len(), 1);

        // Regenerating the owning sheet is not a collision.
        pipeline
            .generate_from_grid(&item, &grid, &mut jobs, &mut registry)
            .unwrap();
    }

    #[test]
    fn hand_written_module_index_survives() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/data")).unwrap();
        fs::write(dir.path().join("src/data/mod.rs"), "pub mod monster;\n").unwrap();
        let pipeline = pipeline(dir.path());
        let mut jobs = MemoryJobStore::new();
        let mut registry = AssetRegistry::load(dir.path().join("registry.json")).unwrap();

        pipeline
            .generate_from_grid(&request(), &monster_grid(), &mut jobs, &mut registry)
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("src/data/mod.rs")).unwrap(),
            "pub mod monster;\n"
        );
    }

    #[tokio::test]
    async fn source_errors_propagate() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path());
        let mut jobs = MemoryJobStore::new();
        let mut registry = AssetRegistry::load(dir.path().join("registry.json")).unwrap();

        assert_matches!(
            pipeline
                .generate(&GridSource::new(), &request(), &mut jobs, &mut registry)
                .await,
            Err(GenerateError::Source(_))
        );
    }
}
