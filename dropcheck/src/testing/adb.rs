use std::io;

use mockall::mock;
use rstest::fixture;

use crate::command::CmdOutput;

// current_time_millis is deliberately not listed so its default
// implementation runs on top of the stubbed shell
mock! {
    pub Adb {

    }

    impl crate::adb::Adb for Adb {
        fn get_connected_devices(&self) -> crate::Result<Vec<String>>;
        fn shell(&self, shell_cmd: &str) -> io::Result<CmdOutput>;
        fn exec_out(&self, shell_cmd: &str) -> io::Result<CmdOutput>;
        fn pull(&self, device: &str, local: &str) -> io::Result<CmdOutput>;
    }
}

#[fixture]
pub fn mock_adb() -> MockAdb {
    MockAdb::new()
}
