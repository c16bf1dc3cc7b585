//! Binary entrypoint for the serialdump CLI.
//!
//! Usage: `serialdump [options] [SERIALDEVICE]`
//!
//! - `-B BAUDRATE` - line speed (default 57600)
//! - `-x` / `-i` - hexadecimal / decimal output
//! - `-s`, `-so`, `-sn` - automatic SLIP, SLIP only, hidden SLIP
//! - `-t`, `-t0`, `-T[FORMAT]` - per-line wall clock, elapsed or strftime stamps
//! - `-d DELAY` - microseconds between two consecutive device writes
//!
//! See the library crate docs for module-level details: `serialdump::`.
use anyhow::Result;
use clap::Parser;
use log::{debug, error, info};

use serialdump::config::Config;
use serialdump::display::{DisplayMode, InboundDecoder, TimestampKind, DEFAULT_TIME_FORMAT};
use serialdump::serial::{open_device, spawn_device_reader};
use serialdump::terminal::{OutboundRelay, Terminal};

#[derive(Parser, Debug)]
#[command(name = "serialdump")]
#[command(about = "Serial line terminal with text, timestamp, decimal, hex and SLIP display")]
#[command(version)]
struct Cli {
    /// Serial device (default /dev/ttyS0)
    #[arg(value_name = "SERIALDEVICE")]
    device: Option<String>,

    /// Baud rate (default 57600)
    #[arg(short = 'B', short_alias = 'b', value_name = "BAUDRATE")]
    baud: Option<u32>,

    /// Hexadecimal output
    #[arg(short = 'x', overrides_with_all = ["int", "slip", "time", "time_format"])]
    hex: bool,

    /// Decimal output
    #[arg(short = 'i', overrides_with_all = ["hex", "slip", "time", "time_format"])]
    int: bool,

    /// Automatic SLIP mode: frames are dumped, everything else shown as text
    #[arg(short = 's', overrides_with_all = ["hex", "int", "time", "time_format"])]
    slip: bool,

    /// With -s: SLIP only mode (all data is SLIP packets, sent data is framed)
    #[arg(short = 'o', requires = "slip", overrides_with = "slip_hide")]
    slip_only: bool,

    /// With -s: hide SLIP packets
    #[arg(short = 'n', requires = "slip", overrides_with = "slip_only")]
    slip_hide: bool,

    /// Add time as msec for each text line
    #[arg(short = 't', overrides_with_all = ["hex", "int", "slip", "time_format"])]
    time: bool,

    /// With -t: time since start instead of wall clock
    #[arg(short = '0', requires = "time")]
    since_start: bool,

    /// Add time for each text line using a strftime FORMAT (attach it: -T%H:%M:%S)
    #[arg(
        short = 'T',
        value_name = "FORMAT",
        num_args = 0..=1,
        default_missing_value = DEFAULT_TIME_FORMAT,
        overrides_with_all = ["hex", "int", "slip", "time"]
    )]
    time_format: Option<String>,

    /// Delay in usec between 2 consecutive writes (default 6000)
    #[arg(short = 'd', value_name = "DELAY", allow_negative_numbers = true)]
    delay: Option<i64>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Write a default configuration file to PATH and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<String>,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Overlay command line settings on top of the file/default configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(ref device) = self.device {
            config.serial.device = device.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(delay) = self.delay {
            config.serial.delay_us = delay;
        }

        let display = &mut config.display;
        if self.hex {
            display.mode = DisplayMode::Hex;
        } else if self.int {
            display.mode = DisplayMode::Int;
        } else if self.slip {
            display.mode = if self.slip_only {
                DisplayMode::Slip
            } else if self.slip_hide {
                DisplayMode::SlipHide
            } else {
                DisplayMode::SlipAuto
            };
        } else if self.time {
            display.mode = DisplayMode::StartDate;
            display.timestamp = if self.since_start {
                TimestampKind::Elapsed
            } else {
                TimestampKind::WallClock
            };
        } else if let Some(ref format) = self.time_format {
            display.mode = DisplayMode::StartDate;
            display.timestamp = TimestampKind::Format;
            display.time_format = Some(format.clone());
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(ref path) = cli.init_config {
        init_logging(&Config::default(), cli.verbose);
        Config::create_default(path).await?;
        info!("Configuration file created at {}", path);
        return Ok(());
    }

    let mut config = match cli.config {
        Some(ref path) => Config::load(path).await?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    init_logging(&config, cli.verbose);
    config.validate()?;
    debug!(
        "Starting serialdump v{} ({:?} mode, {:?} write delay)",
        env!("CARGO_PKG_VERSION"),
        config.display.mode,
        config.serial.delay()
    );

    let port = open_device(&config.serial)?;
    let device_rx = spawn_device_reader(port.try_clone()?);
    let relay = OutboundRelay::new(port, config.serial.delay());
    let decoder = InboundDecoder::new(config.display.mode, config.display.timestamper());
    let mut terminal = Terminal::new(
        tokio::io::stdin(),
        device_rx,
        relay,
        decoder,
        std::io::stdout(),
    );

    if let Err(e) = terminal.run().await {
        if log::log_enabled!(log::Level::Error) {
            error!("{}", e);
        } else {
            eprintln!("serialdump: {}", e);
        }
        // stdin's blocking read would hold the runtime open on a normal return
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(config: &Config, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config.logging.level_filter(),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if let Some(ref file) = config.logging.file {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
        {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));

            let is_tty = atty::is(atty::Stream::Stderr);

            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                if echo_to_console(is_tty, record.level()) {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
            let _ = builder.try_init();
            return;
        }
    }
    builder.format(|fmt, record| {
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
    });
    let _ = builder.try_init();
}

/// With a log file configured, records are echoed to stderr when it is a
/// terminal; warnings and errors always are.
fn echo_to_console(is_tty: bool, level: log::Level) -> bool {
    is_tty || level <= log::Level::Warn
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let cli = Cli::try_parse_from(args).expect("arguments parse");
        let mut config = Config::default();
        cli.apply(&mut config);
        config
    }

    #[test]
    fn test_device_and_baud() {
        let config = parse(&["serialdump", "-B", "115200", "/dev/ttyUSB0"]);
        assert_eq!(config.serial.device, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 115200);
        let config = parse(&["serialdump", "-b", "9600"]);
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn test_slip_variants() {
        assert_eq!(parse(&["serialdump", "-s"]).display.mode, DisplayMode::SlipAuto);
        assert_eq!(parse(&["serialdump", "-so"]).display.mode, DisplayMode::Slip);
        assert_eq!(parse(&["serialdump", "-sn"]).display.mode, DisplayMode::SlipHide);
    }

    #[test]
    fn test_last_mode_flag_wins() {
        assert_eq!(parse(&["serialdump", "-x", "-i"]).display.mode, DisplayMode::Int);
        assert_eq!(parse(&["serialdump", "-i", "-x"]).display.mode, DisplayMode::Hex);
        assert_eq!(parse(&["serialdump", "-s", "-x"]).display.mode, DisplayMode::Hex);
    }

    #[test]
    fn test_timestamp_flags() {
        let config = parse(&["serialdump", "-t"]);
        assert_eq!(config.display.mode, DisplayMode::StartDate);
        assert_eq!(config.display.timestamp, TimestampKind::WallClock);

        let config = parse(&["serialdump", "-t0"]);
        assert_eq!(config.display.timestamp, TimestampKind::Elapsed);

        let config = parse(&["serialdump", "-T%H:%M"]);
        assert_eq!(config.display.timestamp, TimestampKind::Format);
        assert_eq!(config.display.time_format.as_deref(), Some("%H:%M"));

        let config = parse(&["serialdump", "-T"]);
        assert_eq!(config.display.time_format.as_deref(), Some(DEFAULT_TIME_FORMAT));
    }

    #[test]
    fn test_negative_delay_is_rejected_on_validate() {
        let config = parse(&["serialdump", "-d", "-5"]);
        assert_eq!(config.serial.delay_us, -5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_logging_keeps_diagnostics_on_stderr() {
        assert!(echo_to_console(false, log::Level::Error));
        assert!(echo_to_console(false, log::Level::Warn));
        assert!(!echo_to_console(false, log::Level::Info));
        assert!(!echo_to_console(false, log::Level::Trace));
        assert!(echo_to_console(true, log::Level::Debug));
    }

    #[test]
    fn test_too_many_arguments() {
        assert!(Cli::try_parse_from(["serialdump", "/dev/a", "/dev/b"]).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config: Config = toml::from_str(
            "[serial]\nbaud_rate = 9600\n[display]\nmode = \"hex\"\n",
        )
        .unwrap();
        let cli = Cli::try_parse_from(["serialdump", "-B", "921600"]).unwrap();
        cli.apply(&mut config);
        assert_eq!(config.serial.baud_rate, 921600);
        assert_eq!(config.display.mode, DisplayMode::Hex);
    }
}
