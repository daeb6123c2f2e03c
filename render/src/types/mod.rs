//! Common GPU resource vocabulary shared across the crate.

mod buffer;
mod common;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{Extent2d, SampleCount};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};
