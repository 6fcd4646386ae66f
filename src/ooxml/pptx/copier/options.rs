/// Configuration types for slide copying.
///
/// This module defines the options that tune a copy run and the policy
/// applied to shapes that cannot be carried over.
use crate::ooxml::error::{OoxmlError, Result};
use serde::{Deserialize, Serialize};

/// What to do with a shape that references a relationship the copied slide
/// does not carry, such as a chart or an embedded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeFailurePolicy {
    /// Leave the shape out and report it in the slide's diagnostics
    #[default]
    Skip,
    /// Fail the slide copy before the slide is created
    Abort,
}

/// Configuration options for slide copying.
///
/// # Examples
///
/// ```rust
/// use pptx_slide_copier::ooxml::pptx::copier::{CopyOptions, ShapeFailurePolicy};
///
/// // Create with defaults
/// let options = CopyOptions::default();
/// assert!(options.copy_slide_size);
///
/// // Or customize
/// let options = CopyOptions::new()
///     .with_slide_size(false)
///     .with_shape_failure_policy(ShapeFailurePolicy::Abort);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyOptions {
    /// Whether to carry the source slide size over to the target
    pub copy_slide_size: bool,
    /// How to handle shapes that cannot be copied faithfully
    pub shape_failure_policy: ShapeFailurePolicy,
    /// Whether to copy a slide's own background
    pub copy_background: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            copy_slide_size: true,
            shape_failure_policy: ShapeFailurePolicy::Skip,
            copy_background: true,
        }
    }
}

impl CopyOptions {
    /// Create a new `CopyOptions` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to copy the slide size.
    ///
    /// Even when enabled, the size only changes if the target has no slides
    /// yet; otherwise a diagnostic is recorded and the target keeps its size.
    #[inline]
    pub fn with_slide_size(mut self, copy: bool) -> Self {
        self.copy_slide_size = copy;
        self
    }

    /// Set the policy for shapes that cannot be copied.
    #[inline]
    pub fn with_shape_failure_policy(mut self, policy: ShapeFailurePolicy) -> Self {
        self.shape_failure_policy = policy;
        self
    }

    /// Set whether to copy slide backgrounds.
    #[inline]
    pub fn with_background(mut self, copy: bool) -> Self {
        self.copy_background = copy;
        self
    }

    /// Load options from YAML. Missing keys keep their defaults.
    ///
    /// ```rust
    /// use pptx_slide_copier::ooxml::pptx::copier::{CopyOptions, ShapeFailurePolicy};
    ///
    /// let options = CopyOptions::from_yaml("shape_failure_policy: abort\n")?;
    /// assert_eq!(options.shape_failure_policy, ShapeFailurePolicy::Abort);
    /// assert!(options.copy_background);
    /// # Ok::<(), pptx_slide_copier::ooxml::error::OoxmlError>(())
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml)
            .map_err(|e| OoxmlError::Other(format!("Failed to parse copy options: {}", e)))
    }

    /// Serialize options to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self)
            .map_err(|e| OoxmlError::Other(format!("Failed to serialize copy options: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CopyOptions::new();
        assert!(options.copy_slide_size);
        assert!(options.copy_background);
        assert_eq!(options.shape_failure_policy, ShapeFailurePolicy::Skip);
    }

    #[test]
    fn test_builder() {
        let options = CopyOptions::new()
            .with_slide_size(false)
            .with_background(false)
            .with_shape_failure_policy(ShapeFailurePolicy::Abort);
        assert!(!options.copy_slide_size);
        assert!(!options.copy_background);
        assert_eq!(options.shape_failure_policy, ShapeFailurePolicy::Abort);
    }

    #[test]
    fn test_yaml_round_trip() {
        let options = CopyOptions::new().with_background(false);
        let yaml = options.to_yaml().unwrap();
        assert_eq!(CopyOptions::from_yaml(&yaml).unwrap(), options);
    }

    #[test]
    fn test_yaml_rejects_unknown_policy() {
        assert!(CopyOptions::from_yaml("shape_failure_policy: retry\n").is_err());
    }
}
