//! Buffer usage flags and descriptors.

use bitflags::bitflags;

bitflags! {
    /// How a buffer may be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Source of a copy.
        const COPY_SRC = 1 << 0;
        /// Destination of a copy.
        const COPY_DST = 1 << 1;
        /// Vertex input.
        const VERTEX = 1 << 2;
        /// Index input.
        const INDEX = 1 << 3;
        /// Uniform binding.
        const UNIFORM = 1 << 4;
        /// Storage binding.
        const STORAGE = 1 << 5;
    }
}

/// Buffer descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Allowed usages.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a buffer descriptor.
    pub fn new(label: &str, size: u64, usage: BufferUsage) -> Self {
        Self {
            label: Some(label.to_string()),
            size,
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_fields() {
        let desc = BufferDescriptor::new("clusters", 4096, BufferUsage::STORAGE);
        assert_eq!(desc.size, 4096);
        assert!(desc.usage.contains(BufferUsage::STORAGE));
        assert!(!desc.usage.contains(BufferUsage::VERTEX));
    }
}
