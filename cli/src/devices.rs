use clap::{self, Args};

use dropcheck::adb::Adb;
use dropcheck::{DefaultContext, ExecAdb};

/// List connected adb devices
#[derive(Args)]
pub struct Devices {}

impl Devices {
    pub fn run(&self) -> anyhow::Result<()> {
        let ctx = DefaultContext::new();
        let adb = ExecAdb::new(&ctx)?;

        for serial in adb.get_connected_devices()? {
            println!("{}", serial);
        }
        Ok(())
    }
}
