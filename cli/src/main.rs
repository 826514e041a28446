use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Context as AnyhowContext;
use clap::{Parser, Subcommand};
use flexi_logger::{FileSpec, LevelFilter, LogSpecification, Logger, LoggerHandle, WriteMode};

mod devices;
use devices::Devices;

mod entries;
use entries::Entries;

mod time;
use time::Time;

const VERSION_STRING: &'static str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "dropcheck")]
#[command(version(VERSION_STRING))]
struct Cli {
    /// Send log output to the given file instead of stderr
    #[arg(short = 'f', long)]
    log_file: Option<PathBuf>,

    /// Log spec for flexi_logger
    #[arg(short = 's', long)]
    log_spec: Option<String>,

    /// Set the log level, 0 = warn, 1 = info, etc
    #[arg(short = 'l', long, default_value_t = 0)]
    log_level: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the version and exit
    #[command()]
    Version,

    /// Query the device's dropbox service for crash entries
    #[command()]
    Entries(Entries),

    /// List connected adb devices
    #[command()]
    Devices(Devices),

    /// Print the device's current wall clock in epoch milliseconds.
    ///
    /// Time windows for `entries` are evaluated against the device clock,
    /// not the host clock, so this is the reference point to record before
    /// starting a test.
    #[command()]
    Time(Time),
}

impl Cli {
    fn configure_loggers(&self) -> anyhow::Result<LoggerHandle> {
        let log_spec = match &self.log_spec {
            Some(s) => {
                LogSpecification::parse(s).with_context(|| format!("parsing log spec {}", s))?
            }
            None => {
                if self.log_level > 0 {
                    let lvl = if self.log_level == 1 {
                        LevelFilter::Info
                    } else if self.log_level == 2 {
                        LevelFilter::Debug
                    } else {
                        LevelFilter::Trace
                    };
                    LogSpecification::builder().module("dropcheck", lvl).build()
                } else {
                    LogSpecification::env().with_context(|| "getting log spec from env")?
                }
            }
        };

        let mut logger = Logger::with(log_spec);

        if let Some(v) = &self.log_file {
            let path = if v.is_absolute() {
                Cow::Borrowed(v)
            } else {
                Cow::Owned(std::env::current_dir()?.join(v))
            };
            logger = logger
                .log_to_file(
                    FileSpec::try_from(path.as_ref()).with_context(|| "creating filespec")?,
                )
                .append()
                .write_mode(WriteMode::BufferAndFlush);
        }

        Ok(logger.start().with_context(|| "starting logger")?)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = &cli.command {
        println!("{}", VERSION_STRING);
        return Ok(());
    }

    let log_handle = cli.configure_loggers()?;

    let res = match cli.command {
        Commands::Entries(c) => c.run(),
        Commands::Devices(c) => c.run(),
        Commands::Time(c) => c.run(),

        Commands::Version => panic!("unreachable"),
    };

    log_handle.flush();
    res
}
