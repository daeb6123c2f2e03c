//! Texture formats, usage flags, and descriptors.

use bitflags::bitflags;

use super::{Extent2d, SampleCount};

/// Texture format enumeration.
///
/// Only the formats the frame attachments actually use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, linear. Overlay/label rendering.
    Rgba8Unorm,
    /// 16-bit float RGBA. HDR color and transparency accumulation.
    Rgba16Float,
    /// 32-bit unsigned int. Per-pixel pick ids.
    R32Uint,
    /// 8-bit single channel. Transparency revealage.
    R8Unorm,
    /// Two 16-bit floats. Jump-flood seed coordinates.
    Rg16Float,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Whether this is a depth format.
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }

    /// Whether the format holds integer texels (no filtering, no blending).
    pub fn is_integer(&self) -> bool {
        matches!(self, TextureFormat::R32Uint)
    }

    /// Bytes per texel.
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rgba8Unorm
            | TextureFormat::R32Uint
            | TextureFormat::Rg16Float
            | TextureFormat::Depth32Float => 4,
            TextureFormat::Rgba16Float => 8,
        }
    }
}

bitflags! {
    /// How a texture may be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Source of a copy.
        const COPY_SRC = 1 << 0;
        /// Destination of a copy.
        const COPY_DST = 1 << 1;
        /// Sampled in a shader.
        const SAMPLED = 1 << 2;
        /// Read/written as a storage image.
        const STORAGE = 1 << 3;
        /// Color or depth render attachment.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

/// Texture descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Size in pixels.
    pub extent: Extent2d,
    /// Texel format.
    pub format: TextureFormat,
    /// Allowed usages.
    pub usage: TextureUsage,
    /// Sample count (attachments only).
    pub samples: SampleCount,
}

impl TextureDescriptor {
    /// Create a single-sampled 2D texture descriptor.
    pub fn new_2d(
        label: &str,
        extent: Extent2d,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            label: Some(label.to_string()),
            extent,
            format,
            usage,
            samples: SampleCount::One,
        }
    }

    /// Set the sample count.
    pub fn with_samples(mut self, samples: SampleCount) -> Self {
        self.samples = samples;
        self
    }
}
