use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use hlw8032_lib::constants::UART_BAUD;
use hlw8032_lib::{CalibrationConstants, DecodedFrame, FrameReader, Meter};
use tokio_serial::SerialPortBuilderExt;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Read calibrated mains measurements from an HLW8032 energy meter over UART.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Serial device the chip's TX line is attached to
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// UART baud rate (the chip transmits at a fixed 4800)
    #[arg(long, default_value_t = UART_BAUD)]
    baud: u32,

    /// Upper resistor chain of the voltage divider, in ohms
    #[arg(long, default_value_t = 1_880_000.0)]
    vol_r1: f64,

    /// Lower resistor of the voltage divider, in ohms
    #[arg(long, default_value_t = 1_000.0)]
    vol_r2: f64,

    /// Current shunt resistance, in ohms
    #[arg(long, default_value_t = 0.001)]
    shunt: f64,

    /// Emit one JSON object per reading instead of plain text
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(cli.verbose.tracing_level_filter().into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let calibration = CalibrationConstants::from_circuit(cli.vol_r1, cli.vol_r2, cli.shunt)?;
    let port = tokio_serial::new(&cli.port, cli.baud)
        .open_native_async()
        .with_context(|| format!("Failed to open serial port {}", cli.port))?;
    info!(port = %cli.port, baud = cli.baud, "listening for frames");

    let mut reader = FrameReader::new(port);
    let mut meter = Meter::new(calibration);

    while let Some(frame) = reader.next_frame().await? {
        let decoded = DecodedFrame::from(&frame);
        let reading = meter.update(&decoded);
        if cli.json {
            println!(
                "{}",
                serde_json::json!({
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "status": decoded.status,
                    "reading": reading,
                })
            );
        } else {
            println!(
                "{} {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                reading
            );
        }
    }

    let stats = reader.stats();
    info!(
        frames = stats.frames_yielded,
        checksum_failures = stats.checksum_failures,
        bytes_discarded = stats.bytes_discarded,
        "byte source closed"
    );
    Ok(())
}
