//! Shared size and sampling types.

/// A 2D extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent2d {
    /// Create an extent.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero (nothing can be rendered).
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Total pixel count.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Multisample count for render attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleCount {
    /// No multisampling.
    #[default]
    One,
    /// 4x MSAA.
    Four,
}

impl SampleCount {
    /// Raw sample count.
    pub fn count(self) -> u32 {
        match self {
            SampleCount::One => 1,
            SampleCount::Four => 4,
        }
    }

    /// Whether multisampled attachments need single-sample resolve targets.
    pub fn needs_resolve(self) -> bool {
        self != SampleCount::One
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_extent_detection() {
        assert!(Extent2d::new(0, 720).is_zero());
        assert!(Extent2d::new(1280, 0).is_zero());
        assert!(!Extent2d::new(1280, 720).is_zero());
    }

    #[test]
    fn sample_counts() {
        assert_eq!(SampleCount::One.count(), 1);
        assert_eq!(SampleCount::Four.count(), 4);
        assert!(!SampleCount::One.needs_resolve());
        assert!(SampleCount::Four.needs_resolve());
    }
}
