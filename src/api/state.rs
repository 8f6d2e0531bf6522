//! Application state for the R&D claim engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::config::RuleSet;

/// Shared application state.
///
/// Holds the rule set, loaded once at startup and shared read-only by every
/// request.
#[derive(Clone)]
pub struct AppState {
    rules: Arc<RuleSet>,
}

impl AppState {
    /// Creates a new application state with the given rule set.
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    /// Returns the rule set.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        // axum state must be Clone
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_rule_set_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuleSet>();
    }

    #[test]
    fn test_clones_share_rules() {
        let state = AppState::new(RuleSet::default());
        let clone = state.clone();
        assert!(std::ptr::eq(state.rules(), clone.rules()));
    }
}
