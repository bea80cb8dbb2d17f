//! What the engine does after an attempt fails structurally.

use serde::{Deserialize, Serialize};

/// Retry policy for attempts whose edit returned an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Count the failure and move on to the next scheduled attempt.
    #[default]
    Drop,
    /// Draw a new transformer (and, for random scopes, a new node) up to
    /// `max_redraws` more times before giving the attempt up.
    Redraw { max_redraws: usize },
}

impl RetryPolicy {
    /// Additional draws allowed after the first failure.
    pub fn max_redraws(&self) -> usize {
        match self {
            RetryPolicy::Drop => 0,
            RetryPolicy::Redraw { max_redraws } => *max_redraws,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_never_redraws() {
        assert_eq!(RetryPolicy::Drop.max_redraws(), 0);
        assert_eq!(RetryPolicy::default(), RetryPolicy::Drop);
    }

    #[test]
    fn redraw_reports_its_budget() {
        assert_eq!(RetryPolicy::Redraw { max_redraws: 3 }.max_redraws(), 3);
    }

    #[test]
    fn serde_shape() {
        let json = serde_json::to_value(RetryPolicy::Redraw { max_redraws: 2 }).unwrap();
        assert_eq!(json, serde_json::json!({"policy": "redraw", "max_redraws": 2}));
        let back: RetryPolicy = serde_json::from_str(r#"{"policy":"drop"}"#).unwrap();
        assert_eq!(back, RetryPolicy::Drop);
    }
}
