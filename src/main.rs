use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use haptic_bridge::audio::parameters::HapticParams;
use haptic_bridge::audio::pipeline::PipelineHandle;
use haptic_bridge::control::ParameterTuner;
use haptic_bridge::hid::{ControllerPoller, DUALSENSE_PID, DUALSENSE_VID};
use haptic_bridge::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "haptic-bridge", about = "Desktop audio to controller haptics bridge")]
struct Cli {
    /// Port for the local control API
    #[arg(long, env = "HAPTIC_BRIDGE_PORT", default_value_t = 5182)]
    port: u16,

    /// Name substring of the controller's audio render endpoint
    #[arg(long, env = "HAPTIC_BRIDGE_DEVICE", default_value = "Wireless Controller")]
    device: String,

    /// HID vendor id of the controller
    #[arg(long, default_value_t = DUALSENSE_VID, value_parser = parse_hex_u16)]
    hid_vendor_id: u16,

    /// HID product id of the controller
    #[arg(long, default_value_t = DUALSENSE_PID, value_parser = parse_hex_u16)]
    hid_product_id: u16,
}

fn parse_hex_u16(value: &str) -> Result<u16, String> {
    let trimmed = value.trim_start_matches("0x").trim_start_matches("0X");
    let radix = if trimmed.len() != value.len() { 16 } else { 10 };
    u16::from_str_radix(trimmed, radix).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "haptic_bridge=info,tower_http=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let params = HapticParams::new();

    let tuner = ParameterTuner::new(params.clone());
    let mut poller = ControllerPoller::spawn(cli.hid_vendor_id, cli.hid_product_id, tuner);

    let pipeline = Arc::new(PipelineHandle::spawn(params.clone(), cli.device.clone()));

    let state = AppState {
        params,
        pipeline,
        controller_state: poller.state(),
        controller_status: poller.status(),
        endpoint_filter: cli.device.clone(),
    };

    let app = server::router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, device = %cli.device, "haptic bridge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    poller.stop();
    info!("haptic bridge shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
    }
}
