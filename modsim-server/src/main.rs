//! Command-line Modbus slave simulator

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use modsim::config::{SimulatorConfig, SpawnError, TransportConfig};
use modsim::management::Simulator;
use modsim::serial::{Parity, SerialSettings, TimeoutPolicy};
use modsim::sim::SharedRegistry;
use modsim::{DecodeLevel, FrameDecodeLevel, PduDecodeLevel, PhysDecodeLevel, SimError};

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("unable to read {}: {}", .0.display(), .1)]
    Read(PathBuf, std::io::Error),
    #[error("unable to write {}: {}", .0.display(), .1)]
    Write(PathBuf, std::io::Error),
    #[error("invalid configuration file: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error("unable to listen for ctrl-c: {0}")]
    Signal(std::io::Error),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Rtu,
    Tcp,
}

#[derive(Parser)]
#[command(name = "modsim-server")]
#[command(about = "A command line program serving simulated Modbus slaves over TCP or RTU")]
#[command(version)]
struct Cli {
    #[arg(short = 'm', long, value_enum, default_value_t = Mode::Rtu, help = "Modbus mode")]
    mode: Mode,

    #[arg(short = 't', long, default_value = "127.0.0.1", help = "IP address to listen on in TCP mode")]
    hostname: IpAddr,

    #[arg(short = 'P', long, default_value_t = 5005, help = "IP port to listen on in TCP mode")]
    port: u16,

    #[arg(short = 's', long, default_value = "/dev/ttyS0", help = "Serial port to serve in RTU mode")]
    serial: String,

    #[arg(short = 'b', long, default_value_t = 9600, help = "Baud rate of the serial port")]
    rtu_baud: u32,

    #[arg(short = 'p', long, default_value = "none", help = "Parity of the serial port (even, odd or none)")]
    rtu_parity: Parity,

    #[arg(long, default_value_t = 2, help = "Factor applied to the computed RTU timeouts")]
    timeout_factor: u32,

    #[arg(long, help = "Use the fixed 750us / 1750us RTU timeouts above 19200 baud")]
    modbus_floor: bool,

    #[arg(short = 'n', long, default_value_t = 0, help = "Number of slave devices to create")]
    slave_count: u16,

    #[arg(short = 'd', long, default_value_t = 1, help = "Id of the first slave device")]
    slave_start_id: u8,

    #[arg(short = 'c', long, help = "JSON simulator configuration used instead of the options above")]
    config: Option<PathBuf>,

    #[arg(long, help = "JSON snapshot loaded at startup, replacing the generated slaves")]
    snapshot: Option<PathBuf>,

    #[arg(long, help = "File the snapshot is written to on ctrl-c")]
    dump_on_exit: Option<PathBuf>,

    #[arg(long, default_value = "info", help = "Maximum log level")]
    log_level: tracing::Level,

    #[arg(long, default_value = "headers", help = "PDU decode level (nothing, function, headers)")]
    decode_pdu: PduDecodeLevel,

    #[arg(long, default_value = "nothing", help = "Frame decode level (nothing, header, payload)")]
    decode_frame: FrameDecodeLevel,

    #[arg(long, default_value = "nothing", help = "Physical layer decode level (nothing, length, data)")]
    decode_phys: PhysDecodeLevel,
}

impl Cli {
    fn simulator_config(&self) -> SimulatorConfig {
        let transport = match self.mode {
            Mode::Tcp => TransportConfig::Tcp {
                addr: SocketAddr::new(self.hostname, self.port),
            },
            Mode::Rtu => TransportConfig::Rtu {
                path: self.serial.clone(),
                settings: SerialSettings {
                    baud_rate: self.rtu_baud,
                    parity: self.rtu_parity,
                    ..Default::default()
                },
            },
        };

        let timeout_policy = if self.modbus_floor {
            TimeoutPolicy::ModbusFloor
        } else {
            TimeoutPolicy::Scaled(self.timeout_factor)
        };

        SimulatorConfig {
            slave_count: self.slave_count,
            slave_start_id: self.slave_start_id,
            timeout_policy,
            transport,
            ..Default::default()
        }
    }

    fn decode_level(&self) -> DecodeLevel {
        DecodeLevel::new(self.decode_pdu, self.decode_frame, self.decode_phys)
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    run(cli).await.map_err(Into::into)
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = match &cli.config {
        Some(path) => serde_json::from_str(&read(path)?)?,
        None => cli.simulator_config(),
    };

    let registry = SharedRegistry::new(config.build_registry()?);
    let simulator = Simulator::new(registry.clone());

    if let Some(path) = &cli.snapshot {
        simulator.load_json(&read(path)?)?;
        tracing::info!("loaded snapshot from {}", path.display());
    }

    let _server = config.spawn(registry, cli.decode_level()).await?;
    tracing::info!("simulating {} slave(s)", simulator.slaves().len());

    tokio::signal::ctrl_c().await.map_err(Error::Signal)?;
    tracing::info!("shutting down");

    if let Some(path) = &cli.dump_on_exit {
        let json = simulator.dump_json()?;
        std::fs::write(path, json).map_err(|err| Error::Write(path.clone(), err))?;
        tracing::info!("wrote snapshot to {}", path.display());
    }

    Ok(())
}

fn read(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|err| Error::Read(path.to_path_buf(), err))
}
