use crate::error::Error;
use restkit_codec::MapCodec;
use restkit_convert::ConvertOptions;
use restkit_xml::ParseOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Settings for every component. Missing sections and fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub xml: ParseOptions,
    pub convert: ConvertOptions,
    pub codec: MapCodec,
    /// Prefix bindings applied to every compiled query.
    pub namespaces: BTreeMap<String, String>,
}

impl Config {
    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
