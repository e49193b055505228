//! GPIOSysV CLI Client
//!
//! Command-line interface for driving pins through a running server.

use clap::{Parser, Subcommand};
use gpiosysv::ipc::parse_queue_key;
use gpiosysv::protocol::{REPLY_QUEUE_KEY, REQUEST_QUEUE_KEY};
use gpiosysv::{Client, Config, FlashTiming, StrobeTiming};
use tracing_subscriber::{fmt, EnvFilter};

/// GPIOSysV CLI
#[derive(Parser, Debug)]
#[command(name = "gpiosysv-cli")]
#[command(about = "CLI for the GPIOSysV server")]
#[command(version)]
struct Args {
    /// Request queue key
    #[arg(long, default_value_t = REQUEST_QUEUE_KEY, value_parser = parse_queue_key)]
    request_key: i32,

    /// Reply queue key
    #[arg(long, default_value_t = REPLY_QUEUE_KEY, value_parser = parse_queue_key)]
    reply_key: i32,

    /// How long to wait for a query reply (milliseconds)
    #[arg(long, default_value = "1000")]
    timeout_ms: u64,

    /// Use the fixed per-kind reply tags instead of per-call tags
    #[arg(long)]
    fixed_tags: bool,

    /// Return as soon as a timed command is queued
    #[arg(long)]
    no_wait: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive a pin to 0 or 1
    SetPin { pin: u8, value: u8 },

    /// Drive a pin HIGH
    SetPinHigh { pin: u8 },

    /// Drive a pin LOW
    SetPinLow { pin: u8 },

    /// Read a pin
    GetPin { pin: u8 },

    /// Read several pins (comma separated)
    GetPinArray {
        #[arg(value_delimiter = ',')]
        pins: Vec<u8>,
    },

    /// Read several pins as a number, first pin least significant
    GetPinArrayDec {
        #[arg(value_delimiter = ',')]
        pins: Vec<u8>,
    },

    /// Drive several pins LOW
    SetArrayLow {
        #[arg(value_delimiter = ',')]
        pins: Vec<u8>,
    },

    /// Drive several pins HIGH
    SetArrayHigh {
        #[arg(value_delimiter = ',')]
        pins: Vec<u8>,
    },

    /// Show a number in binary on several pins
    SetPinsBinary {
        value: u64,
        #[arg(value_delimiter = ',')]
        pins: Vec<u8>,
    },

    /// Show a number and latch it with one pulse of the select pin
    FlashBinary {
        value: u64,
        select_pin: u8,
        #[arg(value_delimiter = ',')]
        pins: Vec<u8>,
        #[arg(long, default_value = "0")]
        select_dir: u8,
        #[arg(long, default_value = "50000")]
        high_delay: u64,
        #[arg(long, default_value = "50000")]
        low_delay: u64,
    },

    /// Show a number and pulse the select pin repeatedly
    StrobeBinary {
        value: u64,
        select_pin: u8,
        #[arg(value_delimiter = ',')]
        pins: Vec<u8>,
        #[arg(long, default_value = "0")]
        select_dir: u8,
        #[arg(long, default_value = "1")]
        count: u64,
        #[arg(long, default_value = "0")]
        off_count: u64,
        #[arg(long, default_value = "1000000")]
        period: u64,
    },

    /// Pulse a pin HIGH then LOW
    FlashPinHighLow {
        pin: u8,
        #[arg(long, default_value = "1")]
        count: u64,
        #[arg(long, default_value = "50000")]
        high_delay: u64,
        #[arg(long, default_value = "50000")]
        low_delay: u64,
    },

    /// Pulse a pin LOW then HIGH
    FlashPinLowHigh {
        pin: u8,
        #[arg(long, default_value = "1")]
        count: u64,
        #[arg(long, default_value = "50000")]
        high_delay: u64,
        #[arg(long, default_value = "50000")]
        low_delay: u64,
    },

    /// Clock one bit into a shift register
    ShiftDataBit {
        shift_out: u8,
        sr_clk: u8,
        reg_clk: u8,
        bit: u8,
        #[arg(long, default_value = "0")]
        delay: u64,
    },

    /// Clock several bits into a shift register
    ShiftDataArray {
        shift_out: u8,
        sr_clk: u8,
        reg_clk: u8,
        #[arg(value_delimiter = ',')]
        bits: Vec<u8>,
        #[arg(long, default_value = "0")]
        delay: u64,
    },
}

fn run(client: &Client, command: Commands, blocking: bool) -> gpiosysv::Result<()> {
    match command {
        Commands::SetPin { pin, value } => client.set_pin(pin, value),
        Commands::SetPinHigh { pin } => client.set_pin_high(pin),
        Commands::SetPinLow { pin } => client.set_pin_low(pin),
        Commands::GetPin { pin } => {
            match client.get_pin(pin)? {
                Some(level) => println!("{}", level),
                None => println!("unknown"),
            }
            Ok(())
        }
        Commands::GetPinArray { pins } => {
            match client.get_pin_array(&pins)? {
                Some(levels) => {
                    for (pin, level) in levels {
                        println!("{}: {}", pin, level);
                    }
                }
                None => println!("unknown"),
            }
            Ok(())
        }
        Commands::GetPinArrayDec { pins } => {
            match client.get_pin_array_dec(&pins)? {
                Some(value) => println!("{}", value),
                None => println!("unknown"),
            }
            Ok(())
        }
        Commands::SetArrayLow { pins } => client.set_array_low(&pins),
        Commands::SetArrayHigh { pins } => client.set_array_high(&pins),
        Commands::SetPinsBinary { value, pins } => client.set_pins_binary(value, &pins),
        Commands::FlashBinary {
            value,
            pins,
            select_pin,
            select_dir,
            high_delay,
            low_delay,
        } => {
            let timing = FlashTiming { high_delay, low_delay };
            client.flash_binary(value, &pins, select_pin, select_dir, timing, blocking)
        }
        Commands::StrobeBinary {
            value,
            pins,
            select_pin,
            select_dir,
            count,
            off_count,
            period,
        } => {
            let timing = StrobeTiming { count, off_count, period };
            client.strobe_binary(value, &pins, select_pin, select_dir, timing, blocking)
        }
        Commands::FlashPinHighLow {
            pin,
            count,
            high_delay,
            low_delay,
        } => {
            let timing = FlashTiming { high_delay, low_delay };
            client.flash_pin_high_low(pin, count, timing, blocking)
        }
        Commands::FlashPinLowHigh {
            pin,
            count,
            high_delay,
            low_delay,
        } => {
            let timing = FlashTiming { high_delay, low_delay };
            client.flash_pin_low_high(pin, count, timing, blocking)
        }
        Commands::ShiftDataBit {
            shift_out,
            sr_clk,
            reg_clk,
            bit,
            delay,
        } => client.shift_data_bit(shift_out, sr_clk, reg_clk, bit, delay),
        Commands::ShiftDataArray {
            shift_out,
            sr_clk,
            reg_clk,
            bits,
            delay,
        } => client.shift_data_array(shift_out, sr_clk, reg_clk, &bits, delay),
    }
}

fn main() {
    // Logs go to stderr so query output on stdout stays clean
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gpiosysv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .request_queue_key(args.request_key)
        .reply_queue_key(args.reply_key)
        .reply_timeout_ms(args.timeout_ms)
        .unique_reply_tags(!args.fixed_tags)
        .build();
    let client = Client::sysv(config);

    if let Err(e) = run(&client, args.command, !args.no_wait) {
        eprintln!("error {}: {}", e.code(), e);
        std::process::exit(1);
    }
}
