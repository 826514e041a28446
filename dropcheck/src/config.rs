use std::fmt::Display;
use std::path::Path;
use std::{borrow::Cow, time::Duration};

use toml::{Table, Value};

use crate::utils::{path_must_str, read_file};

#[derive(Debug)]
pub enum Error {
    InvalidType,
    MissingKey,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::InvalidType => "InvalidType",
                Self::MissingKey => "MissingKey",
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Typed view of the `dropcheck.toml` config file:
///
/// ```toml
/// [adb]
/// executable = "/opt/android/adb"
/// serial = "emulator-5554"
/// timeout-secs = 60
///
/// [dropbox]
/// tags = ["system_app_crash", "system_app_native_crash"]
/// storage-dir = "/data/system/dropbox"
/// ```
#[derive(Clone, Debug, Default)]
pub struct DropcheckConfig {
    pub adb: AdbConfig,
    pub dropbox: DropboxConfig,
}

#[derive(Clone, Debug, Default)]
pub struct AdbConfig {
    pub executable: Option<String>,
    pub serial: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct DropboxConfig {
    pub tags: Option<Vec<String>>,
    pub storage_dir: Option<String>,
}

impl AdbConfig {
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl DropcheckConfig {
    pub fn parse(source: &Path) -> crate::Result<Self> {
        parse_config(source, |map| {
            let mut cfg = Self::default();

            if let Some(adb) = map.maybe_get_map_typecheck("adb")? {
                cfg.adb.executable = adb.maybe_get_str_typecheck("executable")?.map(String::from);
                cfg.adb.serial = adb.maybe_get_str_typecheck("serial")?.map(String::from);
                cfg.adb.timeout_secs = match adb.maybe_get_int_typecheck("timeout-secs")? {
                    Some(v) if v > 0 => Some(v as u64),
                    Some(_) => {
                        return Err(adb.invalid_key("timeout-secs", "positive int"));
                    }
                    None => None,
                };
            }

            if let Some(dropbox) = map.maybe_get_map_typecheck("dropbox")? {
                cfg.dropbox.tags = dropbox.maybe_get_str_array_typecheck("tags")?;
                cfg.dropbox.storage_dir = dropbox
                    .maybe_get_str_typecheck("storage-dir")?
                    .map(String::from);
            }

            Ok(cfg)
        })
    }
}

pub struct ConfigMap<'c> {
    path: &'c Path,
    name: Option<Cow<'c, str>>,
    table: &'c Table,
}

pub fn parse_config<R, F>(file: &Path, f: F) -> crate::Result<R>
where
    F: FnOnce(&ConfigMap) -> crate::Result<R>,
{
    let as_str = read_file(file)?;

    let table: Table = match toml::from_str(&as_str) {
        Ok(v) => v,
        Err(e) => return Err(crate::Error::new_cfg(file, &e)),
    };

    let base = ConfigMap {
        name: None,
        path: file,
        table: &table,
    };

    f(&base)
}

impl<'c> ConfigMap<'c> {
    fn get_full_path<'a>(&'a self) -> Option<&'a str> {
        self.name.as_ref().map(|it| it.as_ref())
    }

    fn key_path<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match self.get_full_path() {
            None => Cow::Borrowed(key),
            Some(v) => Cow::Owned(format!("{}.{}", v, key)),
        }
    }

    /// Helper to create a crate::Error for a missing key
    pub fn missing_key(&self, key: &str) -> crate::Error {
        let path = self.key_path(key);
        crate::Error::InvalidConfig(
            path_must_str(self.path).into(),
            format!("missing key: {}", path),
        )
    }

    /// Helper to create a crate::Error for an invalid key
    pub fn invalid_key(&self, key: &str, expected: &str) -> crate::Error {
        let path = self.key_path(key);
        crate::Error::InvalidConfig(
            path_must_str(self.path).into(),
            format!(
                "invalid value for key: {} (expected type: {})",
                path, expected
            ),
        )
    }

    pub fn has(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<&'c Value> {
        self.table.get(key)
    }

    pub fn maybe_get_int(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            Some(v) => match v.as_integer() {
                Some(v) => Ok(Some(v)),
                None => Err(Error::InvalidType),
            },
            None => Ok(None),
        }
    }

    pub fn maybe_get_int_typecheck(&self, key: &str) -> crate::Result<Option<i64>> {
        self.maybe_get_int(key)
            .map_err(|_| self.invalid_key(key, "int"))
    }

    pub fn get_str(&self, key: &str) -> Result<&'c str> {
        self.maybe_get_str(key)?.ok_or(Error::MissingKey)
    }

    pub fn maybe_get_str(&self, key: &str) -> Result<Option<&'c str>> {
        match self.get(key) {
            Some(v) => match v.as_str() {
                Some(v) => Ok(Some(v)),
                None => Err(Error::InvalidType),
            },
            None => Ok(None),
        }
    }

    pub fn maybe_get_str_typecheck(&self, key: &str) -> crate::Result<Option<&'c str>> {
        self.maybe_get_str(key)
            .map_err(|_| self.invalid_key(key, "string"))
    }

    pub fn must_get_str(&self, key: &str) -> crate::Result<&'c str> {
        match self.get_str(key) {
            Err(Error::InvalidType) => Err(self.invalid_key(key, "string")),
            Err(Error::MissingKey) => Err(self.missing_key(key)),
            Ok(v) => Ok(v),
        }
    }

    pub fn maybe_get_str_array(&self, key: &str) -> Result<Option<Vec<String>>> {
        let arr = match self.get(key) {
            Some(v) => match v.as_array() {
                Some(v) => v,
                None => return Err(Error::InvalidType),
            },
            None => return Ok(None),
        };

        let mut into = Vec::with_capacity(arr.len());
        for v in arr {
            match v.as_str() {
                Some(s) => into.push(String::from(s)),
                None => return Err(Error::InvalidType),
            }
        }
        Ok(Some(into))
    }

    pub fn maybe_get_str_array_typecheck(&self, key: &str) -> crate::Result<Option<Vec<String>>> {
        self.maybe_get_str_array(key)
            .map_err(|_| self.invalid_key(key, "array of strings"))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
            .ok_or(Error::MissingKey)?
            .as_bool()
            .ok_or(Error::InvalidType)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
            .ok_or(Error::MissingKey)?
            .as_integer()
            .ok_or(Error::InvalidType)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.table
            .get(key)
            .map(|it| it.as_bool().unwrap_or(default))
            .unwrap_or(default)
    }

    pub fn maybe_get_map(&'c self, key: &'c str) -> Result<Option<ConfigMap<'c>>> {
        match self.get(key) {
            Some(v) => match v.as_table() {
                Some(table) => {
                    let name = match &self.get_full_path() {
                        Some(parents) => Cow::Owned(format!("{parents}.{key}")),
                        None => Cow::Borrowed(key),
                    };
                    Ok(Some(Self {
                        name: Some(name),
                        path: self.path,
                        table,
                    }))
                }
                None => Err(Error::InvalidType),
            },
            None => Ok(None),
        }
    }

    pub fn get_map(&'c self, key: &'c str) -> Result<ConfigMap<'c>> {
        self.maybe_get_map(key)?.ok_or(Error::MissingKey)
    }

    pub fn maybe_get_map_typecheck(&'c self, key: &'c str) -> crate::Result<Option<ConfigMap<'c>>> {
        self.maybe_get_map(key)
            .map_err(|_| self.invalid_key(key, "table"))
    }

    pub fn must_get_map(&'c self, key: &'c str) -> crate::Result<ConfigMap<'c>> {
        match self.get_map(key) {
            Err(Error::InvalidType) => Err(self.invalid_key(key, "table")),
            Err(Error::MissingKey) => Err(self.missing_key(key)),
            Ok(v) => Ok(v),
        }
    }
}
