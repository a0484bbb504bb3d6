use clap::Parser;
use sheetforge::{CliArgs, ForgeConfig, LoggingConfig, init_logging, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();

    let logging_config = LoggingConfig::from_env().with_verbosity(cli.verbose);
    let _guard = init_logging(logging_config)?;

    let config = ForgeConfig::from_settings(cli.settings)?;
    run(config, cli.command).await
}
