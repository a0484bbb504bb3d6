use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::codegen::CodegenOptions;
use crate::schema::SheetMode;
use crate::source::{CellRange, DEFAULT_RANGE};

const DEFAULT_SCRIPT_OUTPUT: &str = "src/generated";
const DEFAULT_ASSET_OUTPUT: &str = "assets";
const DEFAULT_NAMESPACE: &str = "generated";
const DEFAULT_JOB_STORE: &str = ".sheetforge/jobs.json";
const DEFAULT_REGISTRY: &str = ".sheetforge/registry.json";
const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    pub project_root: PathBuf,
    /// Where record sources are written, relative to the project root.
    pub script_output: PathBuf,
    /// Where container sources are written, relative to the project root.
    pub container_script_output: PathBuf,
    /// Where bound assets live, relative to the project root.
    pub asset_output: PathBuf,
    pub record_namespace: String,
    pub container_namespace: String,
    pub job_store: PathBuf,
    pub registry_path: PathBuf,
    pub poll_interval: Duration,
    pub range: CellRange,
}

impl ForgeConfig {
    pub fn from_settings(settings: SettingsArgs) -> Result<Self> {
        let SettingsArgs {
            config,
            project_root: cli_project_root,
            script_output: cli_script_output,
            container_script_output: cli_container_script_output,
            asset_output: cli_asset_output,
            record_namespace: cli_record_namespace,
            container_namespace: cli_container_namespace,
            job_store: cli_job_store,
            registry: cli_registry,
            poll_interval_ms: cli_poll_interval_ms,
            range: cli_range,
        } = settings;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            project_root: file_project_root,
            script_output: file_script_output,
            container_script_output: file_container_script_output,
            asset_output: file_asset_output,
            record_namespace: file_record_namespace,
            container_namespace: file_container_namespace,
            job_store: file_job_store,
            registry: file_registry,
            poll_interval_ms: file_poll_interval_ms,
            range: file_range,
        } = file_config;

        let project_root = cli_project_root
            .or(file_project_root)
            .unwrap_or_else(|| PathBuf::from("."));

        let script_output = cli_script_output
            .or(file_script_output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPT_OUTPUT));
        let container_script_output = cli_container_script_output
            .or(file_container_script_output)
            .unwrap_or_else(|| script_output.clone());

        let asset_output = cli_asset_output
            .or(file_asset_output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_OUTPUT));
        anyhow::ensure!(
            is_contained(&asset_output),
            "asset output {:?} must be a relative path inside the project root",
            asset_output
        );
        for output in [&script_output, &container_script_output] {
            anyhow::ensure!(
                is_contained(output),
                "script output {:?} must be a relative path inside the project root",
                output
            );
        }

        let record_namespace = cli_record_namespace
            .or(file_record_namespace)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let container_namespace = cli_container_namespace
            .or(file_container_namespace)
            .unwrap_or_else(|| record_namespace.clone());

        let job_store = cli_job_store
            .or(file_job_store)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JOB_STORE));
        let registry_path = cli_registry
            .or(file_registry)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY));

        let poll_interval = Duration::from_millis(
            cli_poll_interval_ms
                .or(file_poll_interval_ms)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
                .max(1),
        );

        let range = cli_range
            .or(file_range)
            .unwrap_or_else(|| DEFAULT_RANGE.to_string())
            .parse::<CellRange>()
            .context("invalid sheet range")?;

        let config = Self {
            project_root,
            script_output,
            container_script_output,
            asset_output,
            record_namespace,
            container_namespace,
            job_store,
            registry_path,
            poll_interval,
            range,
        };
        config
            .codegen_options()
            .validate()
            .context("invalid namespace configuration")?;
        Ok(config)
    }

    pub fn ensure_project_root(&self) -> Result<()> {
        anyhow::ensure!(
            self.project_root.exists(),
            "project root {:?} does not exist",
            self.project_root
        );
        anyhow::ensure!(
            self.project_root.is_dir(),
            "project root {:?} is not a directory",
            self.project_root
        );
        Ok(())
    }

    pub fn resolve_path<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.project_root.join(relative)
        }
    }

    pub fn codegen_options(&self) -> CodegenOptions {
        CodegenOptions {
            record_namespace: self.record_namespace.clone(),
            container_namespace: self.container_namespace.clone(),
        }
    }

    /// Asset location for a container, relative to the project root and
    /// `/` separated.
    pub fn asset_path_for(&self, container_name: &str) -> String {
        let mut parts: Vec<String> = self
            .asset_output
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        parts.push(format!("{container_name}.{}", crate::binding::assets::ASSET_EXTENSION));
        parts.join("/")
    }
}

fn is_contained(path: &Path) -> bool {
    !path.is_absolute()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sheetforge",
    about = "Generate typed records and data assets from spreadsheets",
    version
)]
pub struct CliArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase log verbosity")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Default, Clone)]
pub struct SettingsArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEETFORGE_PROJECT_ROOT",
        value_name = "DIR",
        help = "Project root all other paths are relative to",
        global = true
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEETFORGE_SCRIPT_OUTPUT",
        value_name = "DIR",
        help = "Directory for generated record sources",
        global = true
    )]
    pub script_output: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEETFORGE_CONTAINER_SCRIPT_OUTPUT",
        value_name = "DIR",
        help = "Directory for generated container sources (defaults to the record directory)",
        global = true
    )]
    pub container_script_output: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEETFORGE_ASSET_OUTPUT",
        value_name = "DIR",
        help = "Directory for bound data assets",
        global = true
    )]
    pub asset_output: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEETFORGE_RECORD_NAMESPACE",
        value_name = "PATH",
        help = "Module path of generated records, e.g. data::tables",
        global = true
    )]
    pub record_namespace: Option<String>,

    #[arg(
        long,
        env = "SHEETFORGE_CONTAINER_NAMESPACE",
        value_name = "PATH",
        help = "Module path of generated containers (defaults to the record namespace)",
        global = true
    )]
    pub container_namespace: Option<String>,

    #[arg(
        long,
        env = "SHEETFORGE_JOB_STORE",
        value_name = "FILE",
        help = "File holding pending generation jobs",
        global = true
    )]
    pub job_store: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEETFORGE_REGISTRY",
        value_name = "FILE",
        help = "File holding the registry of generated sheets",
        global = true
    )]
    pub registry: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEETFORGE_POLL_INTERVAL_MS",
        value_name = "MS",
        help = "Interval between drain attempts",
        value_parser = clap::value_parser!(u64),
        global = true
    )]
    pub poll_interval_ms: Option<u64>,

    #[arg(
        long,
        env = "SHEETFORGE_RANGE",
        value_name = "RANGE",
        help = "Cell range read from each sheet (default A1:Z)",
        global = true
    )]
    pub range: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate sources and a payload for one sheet, and enqueue its binding.
    Generate(GenerateArgs),
    /// Inspect or clear pending generation jobs.
    #[command(subcommand)]
    Jobs(JobsCommand),
    /// Inspect or edit the registry of generated sheets.
    #[command(subcommand)]
    Registry(RegistryCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// A local .xlsx workbook; the spreadsheet id is its path
    Xlsx,
    /// Google Sheets over REST
    Google,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long, value_name = "ID", help = "Spreadsheet id, or workbook path for xlsx")]
    pub spreadsheet: String,

    #[arg(long, value_name = "NAME", help = "Sheet (tab) name")]
    pub sheet: String,

    #[arg(long, value_enum, default_value_t = SheetMode::Table)]
    pub mode: SheetMode,

    #[arg(long, value_enum, default_value_t = SourceKind::Xlsx)]
    pub source: SourceKind,

    #[arg(
        long,
        env = "SHEETFORGE_ACCESS_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        help = "OAuth access token for Google Sheets"
    )]
    pub access_token: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum JobsCommand {
    /// List pending jobs in enqueue order.
    List,
    /// Drop every pending job.
    Clear,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RegistryCommand {
    /// List registered sheets.
    List,
    /// Forget one sheet.
    Remove {
        #[arg(long, value_name = "ID")]
        spreadsheet: String,
        #[arg(long, value_name = "NAME")]
        sheet: String,
    },
    /// Forget every sheet.
    Clear,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    project_root: Option<PathBuf>,
    script_output: Option<PathBuf>,
    container_script_output: Option<PathBuf>,
    asset_output: Option<PathBuf>,
    record_namespace: Option<String>,
    container_namespace: Option<String>,
    job_store: Option<PathBuf>,
    registry: Option<PathBuf>,
    poll_interval_ms: Option<u64>,
    range: Option<String>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
