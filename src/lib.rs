pub mod binding;
pub mod codegen;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod runtime;
pub mod schema;
pub mod source;
pub mod values;

pub use binding::{AssetBinder, AssetStore, FsAssetStore, TypeEnvironment, TypeRegistry};
pub use config::{CliArgs, Command, ForgeConfig};
pub use error::{BindError, GenerateError, SchemaError, SourceError, StoreError};
pub use jobs::{FileJobStore, GenerationJob, JobProcessor, JobStore};
pub use logging::{LoggingConfig, init_logging};
pub use pipeline::{GenerateRequest, GenerationPipeline, GenerationReport};
pub use registry::AssetRegistry;
pub use schema::SheetMode;

use anyhow::{Context, Result};
use config::{GenerateArgs, JobsCommand, RegistryCommand, SourceKind};
use source::{GoogleSheetsSource, SheetSource, WorkbookSource};

/// Execute one CLI command against a resolved configuration.
pub async fn run(config: ForgeConfig, command: Command) -> Result<()> {
    config.ensure_project_root()?;
    match command {
        Command::Generate(args) => generate(&config, args).await,
        Command::Jobs(command) => jobs(&config, command),
        Command::Registry(command) => registry(&config, command),
    }
}

async fn generate(config: &ForgeConfig, args: GenerateArgs) -> Result<()> {
    let source: Box<dyn SheetSource> = match args.source {
        SourceKind::Xlsx => Box::new(WorkbookSource::new(&config.project_root).with_range(config.range)),
        SourceKind::Google => {
            let token = args
                .access_token
                .context("--access-token (or SHEETFORGE_ACCESS_TOKEN) is required for Google Sheets")?;
            Box::new(GoogleSheetsSource::new(token)?.with_range(config.range))
        }
    };

    let mut job_store = FileJobStore::new(config.resolve_path(&config.job_store));
    let mut registry = AssetRegistry::load(config.resolve_path(&config.registry_path))?;
    let pipeline = GenerationPipeline::new(config.clone())?;
    let request = GenerateRequest {
        spreadsheet_id: args.spreadsheet,
        sheet_name: args.sheet,
        mode: args.mode,
    };

    let report = pipeline
        .generate(source.as_ref(), &request, &mut job_store, &mut registry)
        .await
        .with_context(|| format!("failed to generate sheet '{}'", request.sheet_name))?;

    println!(
        "{} ({:?}) -> {}",
        report.record.full_name,
        report.record_write,
        report.record_path.display()
    );
    println!(
        "{} ({:?}) -> {}",
        report.container.full_name,
        report.container_write,
        report.container_path.display()
    );
    println!("queued job {}", report.job.id());
    Ok(())
}

fn jobs(config: &ForgeConfig, command: JobsCommand) -> Result<()> {
    let mut store = FileJobStore::new(config.resolve_path(&config.job_store));
    match command {
        JobsCommand::List => {
            for job in store.read_all()? {
                println!(
                    "{}\t{}\t{}\t{}",
                    job.enqueued_at().to_rfc3339(),
                    job.container_type(),
                    job.sheet_name(),
                    job.asset_path()
                );
            }
        }
        JobsCommand::Clear => {
            store.clear()?;
            tracing::info!(path = %store.path().display(), "cleared pending jobs");
        }
    }
    Ok(())
}

fn registry(config: &ForgeConfig, command: RegistryCommand) -> Result<()> {
    let mut registry = AssetRegistry::load(config.resolve_path(&config.registry_path))?;
    match command {
        RegistryCommand::List => {
            for entry in registry.entries() {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    entry.sheet_id,
                    entry.sheet_name,
                    entry.mode,
                    entry.container_full_name,
                    entry.last_synced.to_rfc3339()
                );
            }
        }
        RegistryCommand::Remove { spreadsheet, sheet } => {
            if !registry.remove(&spreadsheet, &sheet)? {
                anyhow::bail!("no registry entry for '{sheet}' in '{spreadsheet}'");
            }
        }
        RegistryCommand::Clear => registry.clear()?,
    }
    Ok(())
}
