use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// Environment handed to a spawned command. Each command gets its own copy;
/// the process environment itself is never modified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandEnv {
    vars: BTreeMap<OsString, OsString>,
}

impl CommandEnv {
    pub fn from_process() -> Self {
        CommandEnv {
            vars: std::env::vars_os().collect(),
        }
    }

    pub fn with(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}
