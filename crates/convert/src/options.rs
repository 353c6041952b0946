use serde::{Deserialize, Serialize};

/// Names of the synthetic elements the converter introduces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Outer wrapper for a root array, and for a single-key object holding an array.
    pub list_element: String,
    /// Inner wrapper for a root array.
    pub item_element: String,
    /// Name given to the entries of an array that has no key of its own.
    pub nested_array_element: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            list_element: "list".to_string(),
            item_element: "item".to_string(),
            nested_array_element: "array".to_string(),
        }
    }
}
