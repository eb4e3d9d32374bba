#![forbid(unsafe_code)]

mod channel;
mod entropy;
mod error;
mod quarantine;
mod telemetry;

pub use channel::Channel;
pub use entropy::{Entropy, MAX_PREVIEW_BUDGET, MIN_PREVIEW_BUDGET};
pub use error::Error;
pub use quarantine::Quarantine;
pub use telemetry::{Telemetry, TraceKind};

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub channel: Channel,
    pub entropy: Entropy,
    pub quarantine: Quarantine,
    pub telemetry: Telemetry,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TOML file on top of the built-in defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InvalidPath(path.to_path_buf()));
        }
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .extract()?;
        Ok(config.normalized())
    }

    pub fn from_toml_str(input: &str) -> Result<Self, Error> {
        let config: Self = toml_edit::de::from_str(input)?;
        Ok(config.normalized())
    }

    pub fn to_toml_string(&self) -> Result<String, Error> {
        Ok(toml_edit::ser::to_string_pretty(self)?)
    }

    fn normalized(mut self) -> Self {
        self.entropy = self.entropy.clamp();
        self.channel.queue_capacity = self.channel.queue_capacity.max(1);
        self.channel.allowed_uids.sort_unstable();
        self.channel.allowed_uids.dedup();
        self
    }
}
