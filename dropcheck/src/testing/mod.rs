//! Shared fixtures and mocks for the test suite

mod adb;
pub use adb::*;

mod context;
pub use context::*;

mod temp;
pub use temp::*;

mod proto;
pub use proto::*;
