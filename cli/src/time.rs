use clap::{self, Args};

use dropcheck::adb::Adb;
use dropcheck::{DefaultContext, ExecAdb};

/// Print the device's current epoch milliseconds
#[derive(Args)]
pub struct Time {
    /// Android device serial, overrides $ANDROID_SERIAL and the config file
    #[arg(long)]
    serial: Option<String>,
}

impl Time {
    pub fn run(&self) -> anyhow::Result<()> {
        let ctx = DefaultContext::new();

        let mut adb = ExecAdb::new(&ctx)?;
        if let Some(serial) = &self.serial {
            adb = adb.with_serial(serial.clone());
        }

        println!("{}", adb.current_time_millis()?);
        Ok(())
    }
}
