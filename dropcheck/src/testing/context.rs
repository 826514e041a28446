#![allow(unused)]
use std::collections::HashMap;

use mockall::mock;
use rstest::fixture;

use crate::config::DropcheckConfig;
use crate::Context;

#[fixture]
pub fn mock_context() -> MockContext {
    MockContext::new()
}

#[fixture]
pub fn tmp_context() -> TestContext {
    TestContext::default()
}

/// A [Context] backed by in-memory maps, for tests that need consistent env
/// and bin lookups without touching the host environment
#[derive(Default)]
pub struct TestContext {
    env: HashMap<String, String>,
    bins: HashMap<String, String>,
    config: Option<DropcheckConfig>,
}

impl TestContext {
    pub fn set_env<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) -> &mut Self {
        self.env.insert(key.as_ref().into(), value.as_ref().into());
        self
    }

    pub fn set_bin<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, bin: V) -> &mut Self {
        self.bins.insert(key.as_ref().into(), bin.as_ref().into());
        self
    }

    pub fn set_config(&mut self, config: DropcheckConfig) -> &mut Self {
        self.config = Some(config);
        self
    }
}

impl Context for TestContext {
    fn maybe_get_env(&self, key: &str) -> Option<String> {
        self.env.get(key).map(String::from)
    }

    fn maybe_get_bin(&self, bin: &str) -> Option<String> {
        self.bins.get(bin).map(String::from)
    }

    fn get_config(&self) -> crate::Result<Option<DropcheckConfig>> {
        Ok(self.config.clone())
    }
}

mock! {
    pub Context {

    }

    impl crate::Context for Context {
        fn maybe_get_env(&self, key: &str) -> Option<String>;
        fn maybe_get_bin(&self, bin: &str) -> Option<String>;
        fn get_config(&self) -> crate::Result<Option<DropcheckConfig>>;
    }
}
