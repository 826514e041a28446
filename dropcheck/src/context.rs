use std::env;
use std::ops::DerefMut;
use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use which::{which, which_in};

use crate::config::DropcheckConfig;
use crate::Error;

#[derive(Clone)]
struct CachedBin {
    name: String,
    path: String,
}

fn wrapped_which(bin: &str) -> Option<PathBuf> {
    if let Ok(search_path) = env::var("DROPCHECK_PATH") {
        let cwd = env::current_dir().ok()?;
        return which_in(bin, Some(&search_path), &cwd).ok();
    }
    which(bin).ok()
}

fn find_program(prog: &str) -> Option<String> {
    wrapped_which(prog).map(|it| it.to_string_lossy().into())
}

/// Context is a trait for an object that can find binaries, lookup env vars,
/// and load the configuration file.
///
/// Most methods on this trait have a default implementation that is perfectly
/// safe to leave unchanged.
pub trait Context: Send + Sync {
    fn maybe_get_env(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn maybe_get_bin(&self, bin: &str) -> Option<String> {
        find_program(bin)
    }

    fn has_bin(&self, bin: &str) -> bool {
        self.maybe_get_bin(bin).is_some()
    }

    fn get_bin(&self, bin: &str) -> crate::Result<String> {
        self.maybe_get_bin(bin)
            .ok_or_else(|| Error::MissingBin(bin.into()))
    }

    fn has_env(&self, key: &str) -> bool {
        self.maybe_get_env(key).is_some()
    }

    fn get_env(&self, key: &str) -> crate::Result<String> {
        self.maybe_get_env(key)
            .ok_or_else(|| Error::MissingEnv(key.into()))
    }

    /// Returns the config file location: `$DROPCHECK_CONFIG` when set,
    /// otherwise `dropcheck.toml` in the current directory
    fn get_config_file(&self) -> PathBuf {
        match self.maybe_get_env("DROPCHECK_CONFIG") {
            Some(v) => PathBuf::from(v),
            None => PathBuf::from("dropcheck.toml"),
        }
    }

    /// Returns the parsed config file, or `None` if no config file exists
    fn get_config(&self) -> crate::Result<Option<DropcheckConfig>>;
}

pub struct DefaultContext {
    bin_cache: Mutex<Vec<CachedBin>>,
    config: OnceCell<Option<DropcheckConfig>>,
}

impl Clone for DefaultContext {
    fn clone(&self) -> Self {
        let cache = self.bin_cache.lock().expect("failed to lock");
        let config = self.config.clone();
        Self {
            bin_cache: Mutex::new(cache.clone()),
            config,
        }
    }
}

impl DefaultContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for DefaultContext {
    fn default() -> Self {
        Self {
            bin_cache: Mutex::new(Vec::new()),
            config: OnceCell::new(),
        }
    }
}

impl Context for DefaultContext {
    fn maybe_get_env(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn maybe_get_bin(&self, prog: &str) -> Option<String> {
        let mut cache_guard = self.bin_cache.lock().expect("failed to lock");
        let cache = cache_guard.deref_mut();
        let mut it = cache.iter();
        while let Some(val) = it.next() {
            if val.name == prog {
                return Some(val.path.clone());
            }
        }

        let found = find_program(prog)?;

        cache.push(CachedBin {
            name: prog.into(),
            path: found.clone(),
        });

        Some(found)
    }

    fn get_config(&self) -> crate::Result<Option<DropcheckConfig>> {
        let cfg = self
            .config
            .get_or_try_init(|| -> crate::Result<Option<DropcheckConfig>> {
                let path = self.get_config_file();
                if !path.exists() {
                    Ok(None)
                } else {
                    Ok(Some(DropcheckConfig::parse(&path)?))
                }
            })?;
        Ok(cfg.clone())
    }
}
