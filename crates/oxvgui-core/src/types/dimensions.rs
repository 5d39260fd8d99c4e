//! Intrinsic document dimensions.

use serde::{Deserialize, Serialize};

/// Width and height of a document, as reported by the compute endpoint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    /// Create dimensions from a width and a height.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either side is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_wire_shape() {
        let dimensions = Dimensions::new(24.0, 16.5);
        let json = serde_json::to_value(dimensions).unwrap();
        assert_eq!(json, serde_json::json!({ "width": 24.0, "height": 16.5 }));
    }

    #[test]
    fn test_dimensions_empty() {
        assert!(Dimensions::default().is_empty());
        assert!(Dimensions::new(10.0, 0.0).is_empty());
        assert!(!Dimensions::new(10.0, 1.0).is_empty());
    }
}
