//! Configuration settings for the renderer.
//!
//! Settings can be loaded from environment variables or constructed
//! programmatically.

use std::env;

/// Default bound on re-render rounds per [`crate::Renderer::flush`].
const DEFAULT_MAX_FLUSH_ROUNDS: usize = 32;

/// Runtime configuration for a [`crate::Renderer`].
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Re-render rounds one flush may run before giving up on a component
    /// that keeps scheduling itself
    pub max_flush_rounds: usize,
    /// Whether every lifecycle hook invocation is logged at `trace` level
    pub trace_lifecycle: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_flush_rounds: DEFAULT_MAX_FLUSH_ROUNDS,
            trace_lifecycle: false,
        }
    }
}

impl RendererConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `VDOM_MAX_RERENDER_ROUNDS`: Re-render rounds per flush (default: 32, minimum 1)
    /// - `VDOM_TRACE_LIFECYCLE`: Set to "1" to trace lifecycle hooks (default: disabled)
    ///
    /// # Returns
    ///
    /// A new `RendererConfig` instance populated from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let max_flush_rounds = env::var("VDOM_MAX_RERENDER_ROUNDS")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_FLUSH_ROUNDS)
            .max(1);
        let trace_lifecycle = env::var("VDOM_TRACE_LIFECYCLE").ok().as_deref() == Some("1");
        Self {
            max_flush_rounds,
            trace_lifecycle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bounded() {
        let config = RendererConfig::default();
        assert_eq!(config.max_flush_rounds, DEFAULT_MAX_FLUSH_ROUNDS);
        assert!(!config.trace_lifecycle);
        assert!(RendererConfig::from_env().max_flush_rounds >= 1);
    }
}
