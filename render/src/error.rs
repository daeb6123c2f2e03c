//! Render error types.
//!
//! Errors fall into three classes:
//!
//! - **Frame-skip** ([`RenderError::is_frame_skip`]) — stale surface,
//!   zero-size viewport. The frame is abandoned without submission and
//!   retried next tick; handled at the top of the frame loop.
//! - **Fatal** — fence waits that time out, resource creation failures.
//!   Continuing would read torn GPU memory, so these propagate out of
//!   the frame loop and terminate the application.
//! - **Soft** conditions (missing mesh at a time code, empty visibility
//!   set, dangling hover id) are not errors at all; components resolve
//!   them locally as "nothing to draw".

use thiserror::Error;

/// Errors produced by the render orchestration engine.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The presentation surface reported a stale or suboptimal
    /// configuration. Recoverable: skip the frame and rebuild.
    #[error("surface outdated, frame resources need rebuild")]
    SurfaceOutdated,

    /// The viewport has zero area. Recoverable: skip the frame.
    #[error("zero-size viewport ({width}x{height}), frame skipped")]
    ZeroExtent {
        /// Reported width in pixels.
        width: u32,
        /// Reported height in pixels.
        height: u32,
    },

    /// A fence wait did not complete in time. Fatal: buffer contents
    /// can no longer be assumed stable.
    #[error("timed out after {waited_ms} ms waiting for fence '{label}'")]
    FenceWaitTimeout {
        /// What the fence was guarding.
        label: &'static str,
        /// How long the wait ran before giving up.
        waited_ms: u64,
    },

    /// A required GPU resource could not be created. Fatal.
    #[error("failed to create {kind}: {message}")]
    ResourceCreationFailed {
        /// Resource kind, e.g. "texture" or "buffer".
        kind: &'static str,
        /// Backend-provided detail.
        message: String,
    },

    /// A handle referred to a resource the backend no longer knows.
    /// Fatal: indicates a lifetime bookkeeping bug.
    #[error("stale {kind} handle {id}")]
    StaleHandle {
        /// Resource kind.
        kind: &'static str,
        /// Raw handle value.
        id: u64,
    },

    /// The pass graph contains a dependency cycle. Fatal configuration
    /// error detected at graph build time.
    #[error("pass graph contains a cyclic dependency involving '{pass}'")]
    CyclicPassGraph {
        /// Name of a pass on the cycle.
        pass: &'static str,
    },
}

impl RenderError {
    /// Whether this error means "skip the frame and retry next tick"
    /// rather than "abort the application".
    pub fn is_frame_skip(&self) -> bool {
        matches!(
            self,
            RenderError::SurfaceOutdated | RenderError::ZeroExtent { .. }
        )
    }
}

/// Convenience alias used throughout the crate.
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_skip_classification() {
        assert!(RenderError::SurfaceOutdated.is_frame_skip());
        assert!(RenderError::ZeroExtent { width: 0, height: 720 }.is_frame_skip());
        assert!(!RenderError::FenceWaitTimeout {
            label: "upload",
            waited_ms: 5000
        }
        .is_frame_skip());
    }

    #[test]
    fn display_includes_context() {
        let err = RenderError::ZeroExtent { width: 0, height: 0 };
        assert_eq!(err.to_string(), "zero-size viewport (0x0), frame skipped");
    }
}
