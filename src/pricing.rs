//! Static per-model pricing lookup.
//!
//! Rates are USD per 1K tokens. Unknown models fall back to the default
//! rate so cost estimates stay populated even for unrecognized producers.

/// Per-model rate in USD per 1K tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRate {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// Rate applied when the model is unknown or absent.
pub const DEFAULT_RATE: ModelRate = ModelRate {
    input_per_1k: 0.03,
    output_per_1k: 0.06,
};

const RATES: &[(&str, ModelRate)] = &[
    (
        "gpt-4",
        ModelRate {
            input_per_1k: 0.03,
            output_per_1k: 0.06,
        },
    ),
    (
        "gpt-4-turbo",
        ModelRate {
            input_per_1k: 0.01,
            output_per_1k: 0.03,
        },
    ),
    (
        "gpt-4o",
        ModelRate {
            input_per_1k: 0.005,
            output_per_1k: 0.015,
        },
    ),
    (
        "claude-3-opus",
        ModelRate {
            input_per_1k: 0.015,
            output_per_1k: 0.075,
        },
    ),
    (
        "claude-3-sonnet",
        ModelRate {
            input_per_1k: 0.003,
            output_per_1k: 0.015,
        },
    ),
    (
        "claude-3-haiku",
        ModelRate {
            input_per_1k: 0.000_25,
            output_per_1k: 0.001_25,
        },
    ),
    (
        "kimi-k2",
        ModelRate {
            input_per_1k: 0.01,
            output_per_1k: 0.03,
        },
    ),
    (
        "kimi-k2.5",
        ModelRate {
            input_per_1k: 0.01,
            output_per_1k: 0.03,
        },
    ),
];

/// Look up the rate for a model, falling back to [`DEFAULT_RATE`].
#[must_use]
pub fn lookup(model: &str) -> ModelRate {
    RATES
        .iter()
        .find(|(name, _)| *name == model)
        .map_or(DEFAULT_RATE, |(_, rate)| *rate)
}

/// Estimate the cost in USD of a token usage record.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate_cost(model: Option<&str>, tokens_in: u64, tokens_out: u64) -> f64 {
    let rate = model.map_or(DEFAULT_RATE, lookup);
    (tokens_in as f64 * rate.input_per_1k + tokens_out as f64 * rate.output_per_1k) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_model() {
        let rate = lookup("claude-3-haiku");
        assert_eq!(rate.input_per_1k, 0.000_25);
        assert_eq!(rate.output_per_1k, 0.001_25);
    }

    #[test]
    fn test_lookup_unknown_model_falls_back() {
        assert_eq!(lookup("some-future-model"), DEFAULT_RATE);
    }

    #[test]
    fn test_estimate_cost_known_model() {
        // 1000 in + 1000 out on gpt-4o: 0.005 + 0.015
        let cost = estimate_cost(Some("gpt-4o"), 1000, 1000);
        assert!((cost - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_cost_no_model_uses_default() {
        let cost = estimate_cost(None, 1000, 0);
        assert!((cost - 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_cost_zero_tokens() {
        assert_eq!(estimate_cost(Some("gpt-4"), 0, 0), 0.0);
    }
}
