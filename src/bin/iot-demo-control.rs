//! Control application: thresholds on sensor readings, alarm commands out.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use iot_alarm_gateway::cloud::MqttCloudClient;
use iot_alarm_gateway::config::{self, ClientIdentity, ControlConfig};
use iot_alarm_gateway::control::ControlApplication;
use iot_alarm_gateway::logging::init_logging;
use iot_alarm_gateway::{AppContext, Result, Thresholds};

#[derive(Parser)]
#[command(name = "iot-demo-control")]
#[command(about = "Apply temperature thresholds and command the alarm")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, default_value = "iot_demo_control_application.json")]
    config: PathBuf,

    /// Warning threshold in degrees Celsius
    #[arg(long)]
    warning: Option<i32>,

    /// Critical threshold in degrees Celsius
    #[arg(long)]
    critical: Option<i32>,

    /// Tracing filter directives, overriding RUST_LOG
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_filter.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Control application failed: {}", e);
            eprintln!("iot-demo-control: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config: ControlConfig = config::load(&cli.config)?;
    config.thresholds = Thresholds::new(
        cli.warning.unwrap_or(config.thresholds.warning),
        cli.critical.unwrap_or(config.thresholds.critical),
    )?;
    config.validate()?;

    let context = AppContext::new();
    context.install_ctrl_c_handler();

    let (cloud, inbound) =
        MqttCloudClient::connect(&config.cloud, ClientIdentity::Application).await?;

    ControlApplication::new(cloud, config.thresholds)
        .run(&context, inbound)
        .await
}
