//! Feature vectorizer

use crate::{CanvasConfig, EnvironmentState, FeatureVector};

/// Normalizes raw environment state into a [`FeatureVector`].
///
/// Values are divided by the canvas geometry and speed scale and are not
/// clamped; an obstacle past the canvas edge yields components above 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vectorizer {
    canvas: CanvasConfig,
}

impl Vectorizer {
    /// Create a vectorizer for the given canvas
    #[must_use]
    pub fn new(canvas: CanvasConfig) -> Self {
        Self { canvas }
    }

    /// Canvas this vectorizer normalizes against
    #[must_use]
    pub fn canvas(&self) -> &CanvasConfig {
        &self.canvas
    }

    /// Vectorize a state; no state maps to [`FeatureVector::ZERO`]
    #[must_use]
    pub fn vectorize(&self, state: Option<&EnvironmentState>) -> FeatureVector {
        match state {
            Some(state) => FeatureVector([
                state.obstacle_x / self.canvas.width,
                state.obstacle_y / self.canvas.height,
                state.obstacle_width / self.canvas.width,
                state.speed / self.canvas.speed_scale,
            ]),
            None => FeatureVector::ZERO,
        }
    }
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}
