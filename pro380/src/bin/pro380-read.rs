//! Read registers from a PRO380 meter and print them
//!
//! ```text
//! pro380-read --host 192.168.88.22 serial_number meter_code total_active_power
//! pro380-read --host 192.168.88.22 --interval-secs 10 l1_voltage l2_voltage l3_voltage
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use pro380::client::{DeviceBuilder, Poller};
use pro380::{catalog, transport::DEFAULT_PORT};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "pro380-read", about = "Read registers from an Inepro PRO380-Mod meter")]
struct Args {
    /// Modbus gateway host name or address
    #[arg(long)]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value_t = 1)]
    unit_id: u8,

    /// Read/write timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Poll repeatedly and print one JSON reading per interval
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Device id used in JSON readings
    #[arg(long, default_value = "pro380_1")]
    device_id: String,

    /// List the known register names and exit
    #[arg(long)]
    list: bool,

    /// Register names
    #[arg(default_values = ["serial_number", "meter_code", "total_active_power"])]
    registers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list {
        for (name, descriptor) in catalog::iter() {
            println!("{:<22} {}", name, descriptor);
        }
        return Ok(());
    }

    let names: Vec<&str> = args.registers.iter().map(String::as_str).collect();
    let poller = Poller::new(&args.device_id, &names)?;

    let mut device = DeviceBuilder::new()
        .host(&args.host)
        .port(args.port)
        .unit_id(args.unit_id)
        .timeout(Some(Duration::from_millis(args.timeout_ms)))
        .connect()
        .await
        .with_context(|| format!("connecting to {}:{}", args.host, args.port))?;

    let result = match args.interval_secs {
        None => read_once(&mut device, &names).await,
        Some(secs) => poll_forever(&mut device, &poller, Duration::from_secs(secs)).await,
    };

    device.close().await?;
    result
}

async fn read_once(device: &mut pro380::client::Device, names: &[&str]) -> Result<()> {
    for name in names {
        let value = device
            .query_named(name)
            .await
            .with_context(|| format!("reading {}", name))?;
        println!("{}: {}", name, value);
    }
    Ok(())
}

async fn poll_forever(device: &mut pro380::client::Device, poller: &Poller, period: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let reading = match poller.poll_once(device).await {
                    Ok(reading) => reading,
                    Err(e) if e.requires_reopen() => {
                        log::warn!("Poll failed ({}), reopening", e);
                        device.reopen().await.context("reopening session")?;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                println!("{}", reading.to_json()?);
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                return Ok(());
            }
        }
    }
}
