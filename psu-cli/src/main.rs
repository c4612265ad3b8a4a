//! psukit headless runner
//!
//! Wires the supply control core together the way a front end would:
//! load persisted settings, build the backend switch, hang subscribers
//! on the measurement loop, and print telemetry until Ctrl-C. All device
//! access goes through the subscription and query interface; nothing
//! here polls the backend directly.

mod settings;

use std::sync::Arc;

use anyhow::Context;
use psu_device::{DeviceSwitch, PowerSupply, SerialSupply};
use psu_monitor::{Monitor, MonitorConfig, ProtectionConfig};
use psu_sim::SimulatedSupply;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "psukit=info,psu_protocol=info,psu_sim=info,psu_device=info,psu_monitor=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting psukit supply monitor");

    let settings = Settings::load();
    let protection = settings::load_protection();
    list_serial_ports();

    let mut switch = DeviceSwitch::new(
        SerialSupply::new(settings.connection.clone()),
        SimulatedSupply::new(),
    );
    switch.set_load_resistance(settings.load_resistance);
    switch.enable_simulation(settings.simulation_mode);

    if settings.simulation_mode {
        info!(
            "simulation mode: resistive load {} Ω",
            settings.load_resistance
        );
    } else {
        // A missing instrument is not fatal: the loop reports the link as
        // down and recovers on its own once the device answers.
        match switch.connect(&settings.connection).await {
            Ok(()) => match switch.identify().await {
                Ok(idn) => info!("connected: {}", idn.trim()),
                Err(e) => warn!("device opened but did not identify: {e}"),
            },
            Err(e) => warn!(
                "could not connect to {}: {e}; readings stay zeroed until the device answers",
                settings.connection.address
            ),
        }
    }

    let device = Arc::new(tokio::sync::Mutex::new(switch));
    let mut monitor = Monitor::new(device, MonitorConfig::default(), protection);

    monitor.subscribe(|v, i, p| {
        println!("V={v:9.4} V   I={i:8.4} A   P={p:9.4} W");
    });
    monitor.subscribe_protection(|reason| {
        println!("!! {reason} tripped — output forced off; reset to resume");
    });
    monitor.subscribe_limits(|ovp, ocp| {
        info!("limits now OVP {ovp:.2} V / OCP {ocp:.2} A");
    });
    monitor.subscribe_connection_status(|connected| {
        info!(
            "device {}",
            if connected { "connected" } else { "disconnected" }
        );
    });

    monitor.start();
    info!("polling started; Ctrl-C to exit");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    info!("shutting down");
    monitor.stop().await;

    let ovp = monitor.get_ovp();
    let ocp = monitor.get_ocp();
    let protection = ProtectionConfig {
        ovp_enabled: ovp.enabled,
        ovp_limit: ovp.limit,
        ocp_enabled: ocp.enabled,
        ocp_limit: ocp.limit,
    };
    if let Err(e) = settings::save_protection(&protection) {
        warn!("could not persist protection defaults: {e}");
    }
    if let Err(e) = settings.save() {
        warn!("could not persist settings: {e}");
    }

    Ok(())
}

/// Log the serial ports visible on this machine, as a connection aid
fn list_serial_ports() {
    match serialport::available_ports() {
        Ok(ports) if ports.is_empty() => info!("no serial ports detected"),
        Ok(ports) => {
            for port in ports {
                info!("serial port: {}", port.port_name);
            }
        }
        Err(e) => warn!("could not enumerate serial ports: {e}"),
    }
}
