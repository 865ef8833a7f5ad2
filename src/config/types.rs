use std::time::Duration;

use serde::Deserialize;

use crate::args::parsers::parse_duration;
use crate::args::{ConcurrencyArg, ModeArg};
use crate::error::{ConfigError, ValidationError};

/// Values accepted in `sockstress.toml` / `sockstress.json`. Every field is
/// optional; options given on the command line win.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub mode: Option<ModeArg>,
    pub connections: Option<usize>,
    pub concurrency: Option<ConcurrencyArg>,
    pub max_concurrency: Option<usize>,
    pub connect_timeout: Option<DurationValue>,
    pub read_timeout: Option<DurationValue>,
    pub interval: Option<DurationValue>,
    pub duration: Option<DurationValue>,
    pub message: Option<String>,
    pub drain_grace: Option<DurationValue>,
    pub output_dir: Option<String>,
    pub quiet: Option<bool>,
}

/// Either a bare number of seconds or a string with a unit (`"250ms"`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self, field: &'static str) -> Result<Duration, ConfigError> {
        let parsed = match self {
            DurationValue::Seconds(0) => Err(ValidationError::DurationZero),
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration(text),
        };
        parsed.map_err(|source| ConfigError::InvalidDuration { field, source })
    }
}
