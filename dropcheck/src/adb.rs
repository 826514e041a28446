use std::fs;
use std::io;
use std::time::Duration;

use crate::command::{run_cmd, run_cmd_timeout, CmdOutput};
use crate::config::AdbConfig;
use crate::Context;

/// Default bound on any single device command. A hung `adb` invocation shows
/// up as an [io::ErrorKind::TimedOut] error instead of blocking forever.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// The Adb trait just abstracts the `adb` commands the dropbox queries need
pub trait Adb: Send + Sync {
    fn get_connected_devices(&self) -> crate::Result<Vec<String>>;

    /// Essentially the same as running `adb shell '...'`
    fn shell(&self, shell_cmd: &str) -> io::Result<CmdOutput>;

    /// Same as `shell` but via `adb exec-out`, which doesn't mangle binary
    /// output. Used for the dropbox proto dump.
    fn exec_out(&self, shell_cmd: &str) -> io::Result<CmdOutput>;

    /// Essentially the same as running `adb pull $device $local`
    fn pull(&self, device: &str, local: &str) -> io::Result<CmdOutput>;

    /// Reads the device's wall clock in epoch milliseconds.
    ///
    /// Dropbox entry timestamps come from the device clock, so windows over
    /// them have to be opened against this and not the host clock.
    fn current_time_millis(&self) -> crate::Result<i64> {
        let out = self
            .shell("echo ${EPOCHREALTIME:0:-3}")?
            .err_on_status()?;
        let stdout = out.stdout_utf8_lossy();
        let digits = stdout.trim().replace('.', "");
        digits
            .parse::<i64>()
            .map_err(|_| crate::Error::Generic(format!("bad device time output: {}", stdout)))
    }
}

#[derive(Clone)]
/// An `Adb` implementation that just invokes the external `adb` command.
pub struct ExecAdb {
    bin: String,
    serial: Option<String>,
    timeout: Duration,
}

impl ExecAdb {
    /// Creates a new `ExecAdb` from the given context.
    ///
    /// This will first check the config file for an adb section:
    ///
    /// [adb]
    /// serial = "..."
    /// executable = "..."
    /// timeout-secs = 60
    ///
    /// and use that if found. Anything the config doesn't set falls back to
    /// the environment (`$ANDROID_SERIAL`, `$PATH`).
    pub fn new(ctx: &dyn Context) -> crate::Result<Self> {
        match ctx.get_config()? {
            Some(cfg) => Self::try_from_adb_config(ctx, &cfg.adb),
            None => Self::from_env(ctx),
        }
    }

    pub fn from_env(ctx: &dyn Context) -> crate::Result<Self> {
        let bin = ctx.get_bin("adb")?;
        let serial = ctx.maybe_get_env("ANDROID_SERIAL");

        Ok(Self {
            bin,
            serial,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        })
    }

    pub fn try_from_adb_config(ctx: &dyn Context, cfg: &AdbConfig) -> crate::Result<Self> {
        let bin = match &cfg.executable {
            Some(v) => v.clone(),
            None => ctx.get_bin("adb")?,
        };
        let serial = cfg
            .serial
            .clone()
            .or_else(|| ctx.maybe_get_env("ANDROID_SERIAL"));
        let timeout = cfg.get_timeout().unwrap_or(DEFAULT_COMMAND_TIMEOUT);
        Ok(Self {
            bin,
            serial,
            timeout,
        })
    }

    pub fn with_serial(mut self, serial: String) -> Self {
        self.serial = Some(serial);
        self
    }
}

macro_rules! adb_cmd {
    ($adb:ident, $cmd:literal, $($args:expr),*) => {
        if let Some(ref serial) = $adb.serial {
            run_cmd_timeout(&$adb.bin, &["-s", serial, $cmd, $($args),*], $adb.timeout)
        } else {
            run_cmd_timeout(&$adb.bin, &[$cmd, $($args),*], $adb.timeout)
        }
    }
}

impl ExecAdb {
    fn shell_cat_to_file(&self, device: &str, local: &str) -> io::Result<CmdOutput> {
        let shell_cat_result = adb_cmd!(self, "shell", "cat", device);

        match shell_cat_result {
            Err(e) => Err(e),
            Ok(cmd_output) => {
                fs::write(local, cmd_output.stdout)?;
                Ok(CmdOutput {
                    status: cmd_output.status,
                    stdout: Vec::new(),
                    stderr: cmd_output.stderr,
                })
            }
        }
    }
}

impl Adb for ExecAdb {
    /// Returns a list of all connected devices (similar to `adb devices -l`)
    fn get_connected_devices(&self) -> crate::Result<Vec<String>> {
        let output = run_cmd(&self.bin, &["devices", "-l"])?;
        let mut device_list = Vec::new();
        let out_str = output.stdout_utf8_lossy();
        let mut split = out_str.split('\n');
        // Skip the first line
        if split.next().is_none() {
            return Err(crate::Error::NoAdbDevice);
        }

        for l in split {
            if l.is_empty() || !l.contains("device") {
                continue;
            }
            if let Some(id) = l.split_ascii_whitespace().next() {
                device_list.push(id.into());
            }
        }

        if device_list.len() == 0 {
            return Err(crate::Error::NoAdbDevice);
        }

        Ok(device_list)
    }

    fn shell(&self, shell_cmd: &str) -> io::Result<CmdOutput> {
        adb_cmd!(self, "shell", shell_cmd)
    }

    fn exec_out(&self, shell_cmd: &str) -> io::Result<CmdOutput> {
        adb_cmd!(self, "exec-out", shell_cmd)
    }

    fn pull(&self, device: &str, local: &str) -> io::Result<CmdOutput> {
        let pull_result = adb_cmd!(self, "pull", device, local);

        match &pull_result {
            Err(_) => self.shell_cat_to_file(device, local),
            Ok(pull_cmd_output) => {
                if pull_cmd_output.status.success() {
                    pull_result
                } else {
                    self.shell_cat_to_file(device, local)
                }
            }
        }
    }
}
