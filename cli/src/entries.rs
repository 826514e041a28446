use clap::{self, Args};

use dropcheck::adb::Adb;
use dropcheck::dropbox::DEFAULT_CRASH_TAGS;
use dropcheck::{Context, DefaultContext, DropboxCrashDetector, ExecAdb, Strategy, TimeWindow};

/// Query the dropbox service for crash entries
#[derive(Args)]
pub struct Entries {
    /// Dropbox tag to query, repeatable. Defaults to the config file's
    /// dropbox.tags, or the built-in crash tag set.
    #[arg(short = 't', long = "tag")]
    tags: Vec<String>,

    /// Only show entries attributable to this package's process
    #[arg(short, long)]
    package: Option<String>,

    /// Window start, device-clock epoch milliseconds (inclusive)
    #[arg(long)]
    start: Option<i64>,

    /// Window end, device-clock epoch milliseconds (exclusive)
    #[arg(long)]
    end: Option<i64>,

    /// Shortcut for --start: only entries from the last N seconds, measured
    /// against the device clock
    #[arg(long, conflicts_with = "start")]
    last: Option<u64>,

    /// Force a single retrieval strategy (adb-pull, proto-dump or
    /// stdout-dump) instead of the usual fallback order
    #[arg(long)]
    strategy: Option<String>,

    /// Output entries as JSON
    #[arg(short, long, action = clap::ArgAction::SetTrue, default_value_t = false)]
    json: bool,

    /// Android device serial, overrides $ANDROID_SERIAL and the config file
    #[arg(long)]
    serial: Option<String>,
}

impl Entries {
    pub fn run(&self) -> anyhow::Result<()> {
        let ctx = DefaultContext::new();

        let mut adb = ExecAdb::new(&ctx)?;
        if let Some(serial) = &self.serial {
            adb = adb.with_serial(serial.clone());
        }

        let window = self.get_window(&adb)?;
        let config = ctx.get_config()?;

        let tags: Vec<String> = if !self.tags.is_empty() {
            self.tags.clone()
        } else {
            config
                .as_ref()
                .and_then(|cfg| cfg.dropbox.tags.clone())
                .unwrap_or_else(|| DEFAULT_CRASH_TAGS.iter().map(|it| String::from(*it)).collect())
        };

        let mut detector = DropboxCrashDetector::new(adb, tags);
        if let Some(dir) = config.as_ref().and_then(|cfg| cfg.dropbox.storage_dir.clone()) {
            detector = detector.with_storage_dir(dir);
        }

        let entries = match &self.strategy {
            Some(s) => {
                let strategy = s.parse::<Strategy>()?;
                let raw = detector.fetch(&ctx, strategy, &window)?;
                raw.into_iter()
                    .filter(|e| window.contains(e.time_ms))
                    .filter(|e| match &self.package {
                        Some(pkg) => dropcheck::dropbox::entry_matches_package(&e.text, pkg),
                        None => true,
                    })
                    .collect()
            }
            None => detector.get_entries(&ctx, self.package.as_deref(), &window),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        for e in &entries {
            println!("{} {}", e.time_ms, e.tag);
            for line in e.text.lines() {
                println!("    {}", line);
            }
        }

        Ok(())
    }

    fn get_window(&self, adb: &dyn Adb) -> anyhow::Result<TimeWindow> {
        let start = match (self.start, self.last) {
            (Some(start), _) => start,
            (None, Some(secs)) => adb.current_time_millis()? - (secs as i64) * 1000,
            (None, None) => 0,
        };

        Ok(match self.end {
            Some(end) => TimeWindow::new(start, end),
            None => TimeWindow::since(start),
        })
    }
}
