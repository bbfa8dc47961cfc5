//! Gateway: TC74 readings up to the cloud, alarm commands down to the BLE tag.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use iot_alarm_gateway::ble::{DbusBus, ObjectBus};
use iot_alarm_gateway::cloud::MqttCloudClient;
use iot_alarm_gateway::config::{self, ClientIdentity, GatewayConfig};
use iot_alarm_gateway::gateway::{locate_actuator, Gateway};
use iot_alarm_gateway::logging::init_logging;
use iot_alarm_gateway::sensor::{create_sensor, SensorKind};
use iot_alarm_gateway::{AppContext, Result};

#[derive(Parser)]
#[command(name = "iot-demo-gateway")]
#[command(about = "Publish temperature readings and drive the BLE alarm")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, default_value = "iot_demo_gateway.json")]
    config: PathBuf,

    /// Sensor kind, overriding the configuration (dummy, tc74)
    #[arg(long)]
    sensor: Option<String>,

    /// Run without the BLE alarm
    #[arg(long)]
    no_actuator: bool,

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
            error!("Gateway failed: {}", e);
            eprintln!("iot-demo-gateway: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config: GatewayConfig = config::load(&cli.config)?;
    if let Some(kind) = cli.sensor {
        config.sensor.kind = kind.parse::<SensorKind>()?;
    }
    if cli.no_actuator {
        config.actuator.enabled = false;
    }
    config.validate()?;

    let context = AppContext::new();
    context.install_ctrl_c_handler();

    let sensor = create_sensor(
        config.sensor.kind,
        config.sensor.i2c_bus,
        config.sensor.address,
    )?;

    let actuator = if config.actuator.enabled {
        let bus: Arc<dyn ObjectBus> = Arc::new(DbusBus::system().await?);
        let actuator = locate_actuator(&bus, &config.actuator).await?;
        info!("Actuator ready at {}", actuator.device().path());
        Some(actuator)
    } else {
        warn!("Actuator disabled, alarm commands will be dropped");
        None
    };

    let (cloud, inbound) = MqttCloudClient::connect(&config.cloud, ClientIdentity::Gateway).await?;

    Gateway::new(cloud, sensor, actuator, config.sensor.interval())
        .run(&context, inbound)
        .await
}
