//! GPIOSysV Server Binary
//!
//! Owns the pins and serves clients on the request queue until SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use gpiosysv::driver::{GpioDriver, MemoryDriver, SysfsDriver, DEFAULT_SYSFS_BASE};
use gpiosysv::ipc::{parse_queue_key, MemoryTransport, SysVTransport, Transport};
use gpiosysv::protocol::{REPLY_QUEUE_KEY, REQUEST_QUEUE_KEY};
use gpiosysv::server::SignalListener;
use gpiosysv::{Config, Server};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum DriverKind {
    /// Kernel sysfs GPIO interface
    Sysfs,
    /// In-memory pins (dry run)
    Memory,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    /// Kernel System V message queues
    Sysv,
    /// In-process queues (dry run, no clients can reach it)
    Memory,
}

/// GPIOSysV Server
#[derive(Parser, Debug)]
#[command(name = "gpiosysv-server")]
#[command(about = "GPIO server driven over System V message queues")]
#[command(version)]
struct Args {
    /// Request queue key
    #[arg(long, default_value_t = REQUEST_QUEUE_KEY, value_parser = parse_queue_key)]
    request_key: i32,

    /// Reply queue key
    #[arg(long, default_value_t = REPLY_QUEUE_KEY, value_parser = parse_queue_key)]
    reply_key: i32,

    /// How often the loop re-checks its running flag (milliseconds)
    #[arg(short, long, default_value = "1000")]
    poll_ms: u64,

    /// Pin driver
    #[arg(short, long, value_enum, default_value_t = DriverKind::Sysfs)]
    driver: DriverKind,

    /// Root of the sysfs GPIO tree
    #[arg(long, default_value = DEFAULT_SYSFS_BASE)]
    sysfs_base: PathBuf,

    /// Queue transport
    #[arg(short, long, value_enum, default_value_t = TransportKind::Sysv)]
    transport: TransportKind,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gpiosysv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("GPIOSysV Server v{}", gpiosysv::VERSION);
    tracing::info!("Request queue: 0x{:08x}", args.request_key);
    tracing::info!("Reply queue: 0x{:08x}", args.reply_key);

    let config = Config::builder()
        .request_queue_key(args.request_key)
        .reply_queue_key(args.reply_key)
        .poll_interval_ms(args.poll_ms)
        .build();

    let driver: Arc<dyn GpioDriver> = match args.driver {
        DriverKind::Sysfs => Arc::new(SysfsDriver::with_base(&args.sysfs_base)),
        DriverKind::Memory => Arc::new(MemoryDriver::new()),
    };
    let transport: Arc<dyn Transport> = match args.transport {
        TransportKind::Sysv => Arc::new(SysVTransport::with_max_payload(config.max_message_size)),
        TransportKind::Memory => Arc::new(MemoryTransport::with_max_payload(config.max_message_size)),
    };

    let mut server = Server::new(config, transport, driver);

    // Signals must be blocked before any other thread exists
    if let Err(e) = SignalListener::install(server.lifecycle()) {
        tracing::error!("Failed to install signal handling: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
