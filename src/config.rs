//! Book configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of dense price slots per side for the hot-zone variant.
pub const DEFAULT_HOT_WIDTH: u32 = 4096;

/// What a move does when asked for a size above the order's remaining size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveSizePolicy {
    /// Keep the current size and report success
    #[default]
    IgnoreIncrease,
    /// Leave the order untouched and report `MatchingMoveRejectedSizeIncrease`
    RejectIncrease,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    /// Dense window width (in ticks) of the hot-zone variant
    pub hot_width: u32,
    /// The window recenters when the best price comes within this many
    /// ticks of either edge
    pub recenter_margin: u32,
    /// Order slots reserved up front
    pub order_capacity: u32,
    pub move_size_policy: MoveSizePolicy,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            hot_width: DEFAULT_HOT_WIDTH,
            recenter_margin: DEFAULT_HOT_WIDTH / 8,
            order_capacity: 1024,
            move_size_policy: MoveSizePolicy::IgnoreIncrease,
        }
    }
}

impl BookConfig {
    pub fn with_hot_width(mut self, width: u32) -> Self {
        self.hot_width = width;
        self.recenter_margin = width / 8;
        self
    }

    pub fn with_order_capacity(mut self, capacity: u32) -> Self {
        self.order_capacity = capacity;
        self
    }

    pub fn with_move_size_policy(mut self, policy: MoveSizePolicy) -> Self {
        self.move_size_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hot_width == 0 {
            return Err(ConfigError::ZeroHotWidth);
        }
        if self.recenter_margin.saturating_mul(2) >= self.hot_width {
            return Err(ConfigError::MarginTooWide {
                margin: self.recenter_margin,
                width: self.hot_width,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(BookConfig::default().validate().is_ok());
    }

    #[test]
    fn test_with_hot_width_scales_margin() {
        let config = BookConfig::default().with_hot_width(64);
        assert_eq!(config.hot_width, 64);
        assert_eq!(config.recenter_margin, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let zero = BookConfig::default().with_hot_width(0);
        assert!(matches!(zero.validate(), Err(ConfigError::ZeroHotWidth)));

        let wide = BookConfig {
            hot_width: 10,
            recenter_margin: 5,
            ..BookConfig::default()
        };
        assert!(matches!(wide.validate(), Err(ConfigError::MarginTooWide { .. })));
    }
}
