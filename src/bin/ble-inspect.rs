//! Dump BlueZ devices and their GATT trees, then cycle the alert level.

use clap::Parser;
use std::fmt::Debug;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use iot_alarm_gateway::ble::{
    describe, fetch_devices, AcceptAll, AdapterScanner, BleDevice, DbusBus, DeviceFilter,
    NameFilter, ObjectBus, ALERT_LEVEL_UUID, DEFAULT_ADAPTER, IMMEDIATE_ALERT_SERVICE_UUID,
};
use iot_alarm_gateway::logging::init_logging;
use iot_alarm_gateway::{AlarmLevel, Result};

#[derive(Parser)]
#[command(name = "ble-inspect")]
#[command(about = "Inspect BLE devices known to BlueZ and exercise the alert level")]
struct Cli {
    /// Local adapter
    #[arg(long, default_value = DEFAULT_ADAPTER)]
    adapter: String,

    /// Device name to look for
    #[arg(long, default_value = "ITAG")]
    name: String,

    /// List every device regardless of name or connection
    #[arg(long)]
    all: bool,

    /// Also accept devices that are not connected
    #[arg(long)]
    include_disconnected: bool,

    /// Run a discovery scan of this many seconds first
    #[arg(long, default_value_t = 0)]
    scan: u64,

    /// Alert level read/write/read cycles to run on the first match
    #[arg(long, default_value_t = 3)]
    cycles: u32,

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
            error!("Inspection failed: {}", e);
            eprintln!("ble-inspect: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.scan > 0 {
        let scanner = AdapterScanner::new(&cli.adapter).await?;
        for peripheral in scanner.scan_for(Duration::from_secs(cli.scan)).await? {
            println!(
                "seen {} {} rssi={:?}",
                peripheral.address,
                peripheral.local_name.as_deref().unwrap_or("(unnamed)"),
                peripheral.rssi
            );
        }
    }

    let bus: Arc<dyn ObjectBus> = Arc::new(DbusBus::system().await?);

    let filter: Box<dyn DeviceFilter> = if cli.all {
        Box::new(AcceptAll)
    } else {
        Box::new(NameFilter {
            name: cli.name.clone(),
            require_connected: !cli.include_disconnected,
        })
    };

    let devices = fetch_devices(&bus, &*filter, &cli.adapter).await?;
    if devices.is_empty() {
        warn!("No matching devices on {}", cli.adapter);
        return Ok(());
    }

    for device in &devices {
        dump_properties(device).await;
        dump_gatt(device).await?;
    }

    if cli.cycles > 0 {
        cycle_alert_level(&devices, cli.cycles).await?;
    }

    Ok(())
}

fn field<T: Debug>(name: &str, value: Result<Option<T>>) {
    match value {
        Ok(Some(value)) => println!("  {:<18} {:?}", name, value),
        Ok(None) => println!("  {:<18} -", name),
        Err(e) => println!("  {:<18} <{}>", name, e),
    }
}

async fn dump_properties(device: &BleDevice) {
    println!("{}", device.path());
    field("Address", device.address().await);
    field("AddressType", device.address_type().await);
    field("Name", device.name().await);
    field("Alias", device.alias().await);
    field("Class", device.class().await);
    field("Appearance", device.appearance().await);
    field("Icon", device.icon().await);
    field("Paired", device.paired().await);
    field("Trusted", device.trusted().await);
    field("Blocked", device.blocked().await);
    field("LegacyPairing", device.legacy_pairing().await);
    field("RSSI", device.rssi().await);
    field("Connected", device.connected().await);
    field("UUIDs", device.uuids().await);
    field("Modalias", device.modalias().await);
    field("Adapter", device.adapter().await);
    field("ManufacturerData", device.manufacturer_data().await);
    field("ServiceData", device.service_data().await);
    field("TxPower", device.tx_power().await);
    field("ServicesResolved", device.services_resolved().await);
    field("AdvertisingFlags", device.advertising_flags().await);
    field("AdvertisingData", device.advertising_data().await);
}

async fn dump_gatt(device: &BleDevice) -> Result<()> {
    let mut services: Vec<_> = device.services().await?.values().collect();
    services.sort_by(|a, b| a.path().as_str().cmp(b.path().as_str()));

    for service in services {
        println!(
            "  service {} {} ({})",
            service.uuid(),
            describe(&service.uuid()).unwrap_or(""),
            service.path().name()
        );

        let mut characteristics: Vec<_> = service.characteristics().await?.values().collect();
        characteristics.sort_by(|a, b| a.path().as_str().cmp(b.path().as_str()));

        for chrc in characteristics {
            let flags = chrc.flags().await?.unwrap_or_default().join(",");
            println!(
                "    characteristic {} {} [{}]",
                chrc.uuid(),
                describe(&chrc.uuid()).unwrap_or(""),
                flags
            );
        }
    }
    Ok(())
}

async fn cycle_alert_level(devices: &[Arc<BleDevice>], cycles: u32) -> Result<()> {
    for device in devices {
        let Some(service) = device.service(&IMMEDIATE_ALERT_SERVICE_UUID).await? else {
            continue;
        };
        let Some(chrc) = service.characteristic(&ALERT_LEVEL_UUID).await? else {
            continue;
        };

        info!("Cycling alert level on {}", device.path());
        for cycle in 1..=cycles {
            let before = chrc.read_value().await?;
            let next = before
                .first()
                .and_then(|&b| AlarmLevel::try_from(b).ok())
                .unwrap_or_default()
                .next();

            chrc.write_value(&[next.as_u8()]).await?;
            let after = chrc.read_value().await?;

            println!(
                "cycle {}: {:?} -> wrote {} -> {:?}",
                cycle,
                before,
                next.as_u8(),
                after
            );
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        return Ok(());
    }

    warn!("No device exposes the alert level characteristic");
    Ok(())
}
