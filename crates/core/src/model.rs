//! Model metadata as published by the model's cost table.

use serde::{Deserialize, Serialize};

/// Published metadata for one model. Every figure may be unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier as requested.
    pub name: String,

    /// Currency per input token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_cost_per_token: Option<f64>,

    /// Currency per output token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_cost_per_token: Option<f64>,

    /// Maximum input size in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_input_tokens: Option<usize>,
}

impl ModelInfo {
    /// Metadata with nothing known.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_cost_per_token: None,
            output_cost_per_token: None,
            max_input_tokens: None,
        }
    }

    /// Input cost per token, `0` when unknown.
    pub fn token_unit_cost(&self) -> f64 {
        self.input_cost_per_token.unwrap_or(0.0)
    }

    /// Maximum input tokens, `0` when unknown.
    pub fn max_tokens(&self) -> usize {
        self.max_input_tokens.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_metadata_degrades_to_zero() {
        let info = ModelInfo::unknown("mystery/model");
        assert_eq!(info.token_unit_cost(), 0.0);
        assert_eq!(info.max_tokens(), 0);
    }
}
