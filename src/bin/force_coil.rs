//! Force Coil
//!
//! Connects to a Modbus TCP server, writes a single coil and reports the
//! outcome. The session is always closed, even after a failed write.
//!
//! Usage: cargo run --bin force_coil [host] [port] [unit] [address] [on|off]
//! Example: cargo run --bin force_coil localhost 502 1 1 on
//!
//! Set `RUST_LOG=debug` for frame-level logging.

use std::process::ExitCode;

use coil_modbus::{ClientConfig, ModbusClient, ModbusError, ModbusTcpClient, DEFAULT_TCP_PORT};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct Args {
    host: String,
    port: u16,
    unit_id: u8,
    address: u16,
    value: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);

    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port = match args.next() {
        Some(p) => p.parse().map_err(|e| format!("invalid port '{}': {}", p, e))?,
        None => DEFAULT_TCP_PORT,
    };
    let unit_id = match args.next() {
        Some(u) => u.parse().map_err(|e| format!("invalid unit id '{}': {}", u, e))?,
        None => 1,
    };
    let address = match args.next() {
        Some(a) => a.parse().map_err(|e| format!("invalid coil address '{}': {}", a, e))?,
        None => 1,
    };
    let value = match args.next().as_deref() {
        None | Some("on") | Some("ON") | Some("1") | Some("true") => true,
        Some("off") | Some("OFF") | Some("0") | Some("false") => false,
        Some(other) => return Err(format!("invalid coil value '{}' (use on/off)", other)),
    };

    Ok(Args {
        host,
        port,
        unit_id,
        address,
        value,
    })
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("usage: force_coil [host] [port] [unit] [address] [on|off]");
            return ExitCode::from(2);
        }
    };

    let state = if args.value { "ON" } else { "OFF" };
    let mut client = ModbusTcpClient::new(ClientConfig::default());

    if let Err(e) = client.connect(&args.host, args.port).await {
        eprintln!("Connection to {}:{} failed: {}", args.host, args.port, e);
        return ExitCode::FAILURE;
    }

    let result = client.write_coil(args.unit_id, args.address, args.value).await;

    if let Err(e) = client.close().await {
        eprintln!("Close error: {}", e);
    }

    match result {
        Ok(()) => {
            println!(
                "Coil {} on unit {} forced {}",
                args.address, args.unit_id, state
            );
            ExitCode::SUCCESS
        }
        Err(ModbusError::Exception { code, message, .. }) => {
            eprintln!(
                "Device refused to force coil {} {}: exception 0x{:02X} ({})",
                args.address, state, code, message
            );
            ExitCode::FAILURE
        }
        Err(e) if e.requires_reconnect() => {
            eprintln!(
                "Link error while forcing coil {} {}; coil state unknown: {}",
                args.address, state, e
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Failed to force coil {} {}: {}", args.address, state, e);
            ExitCode::FAILURE
        }
    }
}
