//! Command-line EEPROM read/write utility.
//!
//! ```sh
//! # Dump bank 1 as hex
//! eeprom-access --read --bank 1
//!
//! # Write four bytes at offset 0x10 of bank 1
//! eeprom-access --write --bank 1 --offset 16 --byte deadbeef
//!
//! # Write a file into bank 1 without touching the hardware
//! eeprom-access --write --bank 1 --file blob.bin --test
//! ```
//!
//! Every run appends its audit entries to the log file, including test runs.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};

use eeprom_access::config::{DEFAULT_BUS_ID, DEFAULT_LOG_PATH};
use eeprom_access::linux::LinuxBus;
use eeprom_access::{hex, BusTransport, DryRunBus, Endpoint, EndpointConfig};

/// Read or write the on-board EEPROM banks.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["read", "write"])))]
#[command(group(ArgGroup::new("source").args(["file", "byte"])))]
struct Args {
    /// Read data from EEPROM
    #[arg(short, long)]
    read: bool,

    /// Write data to EEPROM
    #[arg(short, long)]
    write: bool,

    /// Read/write raw bytes to/from this file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Read/write hex to/from the terminal; takes the hex data when writing
    #[arg(
        long,
        visible_alias = "terminal",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    byte: Option<String>,

    /// EEPROM bank (0 or 1). Bank 0 is for reserved data.
    #[arg(short, long)]
    bank: usize,

    /// Address offset within the bank
    #[arg(short, long, default_value_t = 0)]
    offset: usize,

    /// Number of bytes to read or write (writes are capped at the source length)
    #[arg(short, long, default_value_t = 256)]
    length: usize,

    /// Only write to the log, never to the device
    #[arg(short, long)]
    test: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// I2C bus number
    #[arg(long, default_value_t = DEFAULT_BUS_ID)]
    bus: u32,

    /// Audit log file (`-` for standard output)
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    log_file: PathBuf,

    /// Deprecated, ignored
    #[arg(short, long, hide = true)]
    serial: Option<String>,

    /// Deprecated, ignored
    #[arg(short, long, hide = true)]
    null: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if args.serial.is_some() || args.null.is_some() {
        log::warn!("--serial and --null are deprecated and have no effect");
    }

    let config = EndpointConfig::default()
        .with_bus_id(args.bus)
        .with_log_path(&args.log_file);
    let transport: Box<dyn BusTransport> = if args.test {
        Box::new(DryRunBus::new())
    } else {
        Box::new(LinuxBus::new())
    };

    let mut ep = Endpoint::new(config, transport)?;
    ep.connect()
        .with_context(|| format!("connecting to EEPROM on bus {}", args.bus))?;

    let outcome = if args.read {
        read(&mut ep, &args)
    } else {
        write(&mut ep, &args)
    };

    let flushed = if args.log_file.as_os_str() == "-" {
        ep.write_log_entries_to(&mut std::io::stdout().lock())
    } else {
        ep.write_log_entries()
    }
    .with_context(|| format!("appending audit log {}", args.log_file.display()));
    outcome?;
    flushed?;
    Ok(())
}

fn read(ep: &mut Endpoint<Box<dyn BusTransport>>, args: &Args) -> Result<()> {
    let content = ep.read_bytes(args.bank, args.offset, args.length)?;

    match &args.file {
        Some(path) => {
            log::info!("writing EEPROM contents to {}", path.display());
            std::fs::write(path, &content)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        None => {
            log::info!("reading EEPROM contents to terminal");
            println!("{}", hex::encode(&content));
        }
    }
    Ok(())
}

fn write(ep: &mut Endpoint<Box<dyn BusTransport>>, args: &Args) -> Result<()> {
    let mut content = match (&args.file, &args.byte) {
        (Some(path), _) => {
            log::info!("writing {} contents to EEPROM", path.display());
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, Some(text)) => {
            log::info!("writing terminal contents ({text}) to EEPROM");
            hex::decode(text)?
        }
        (None, None) => bail!("--write needs --file or --byte"),
    };
    content.truncate(args.length);
    log::debug!("writing {} bytes", content.len());

    ep.write_bytes(args.bank, args.offset, &content, content.len())?;
    Ok(())
}
