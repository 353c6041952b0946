use serde::{Deserialize, Serialize};

/// Parser limits and switches, deserializable from configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Accept documents carrying a DOCTYPE, expanding internal entities.
    pub allow_dtd: bool,
    /// Maximum number of nodes a single document may contain.
    pub nodes_limit: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            allow_dtd: true,
            nodes_limit: u32::MAX,
        }
    }
}

impl ParseOptions {
    pub(crate) fn to_parsing_options<'i>(self) -> roxmltree::ParsingOptions<'i> {
        let mut options = roxmltree::ParsingOptions::default();
        options.allow_dtd = self.allow_dtd;
        options.nodes_limit = self.nodes_limit;
        options
    }
}
