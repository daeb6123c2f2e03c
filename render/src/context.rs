//! Editor state the renderer consumes each frame.
//!
//! Handed in explicitly by the caller every frame rather than read from
//! process-wide state, so two editors (or a test) can drive the
//! orchestrator side by side.

use primforge_core::math::Vec2;

use crate::scene::PrimId;

/// The editor's active interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    /// Free camera flight; no editing surfaces needed.
    #[default]
    Roaming,
    /// Box/click selection.
    Select,
    /// Vertex painting.
    Paint,
}

impl InteractionMode {
    /// Whether pick, overlay, outline and occlusion passes should run.
    pub fn is_edit_capable(&self) -> bool {
        matches!(self, InteractionMode::Select | InteractionMode::Paint)
    }
}

/// Screen-space selection box, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionBox {
    /// One corner.
    pub min: Vec2,
    /// The opposite corner.
    pub max: Vec2,
}

/// Screen-space paint brush, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintBrush {
    /// Brush center.
    pub center: Vec2,
    /// Brush radius.
    pub radius: f32,
}

/// Per-frame editor inputs.
#[derive(Debug, Clone, Default)]
pub struct EditorContext {
    /// Active interaction mode.
    pub mode: InteractionMode,
    /// Selection box while dragging in select mode.
    pub selection: Option<SelectionBox>,
    /// Brush while painting.
    pub brush: Option<PaintBrush>,
    /// Primitive with keyboard/selection focus.
    pub focused: Option<PrimId>,
    /// Primitive under the cursor.
    pub hovered: Option<PrimId>,
}

impl EditorContext {
    /// Context for a roaming (non-editing) frame.
    pub fn roaming() -> Self {
        Self::default()
    }

    /// Primitives that should receive an outline this frame, deduplicated.
    pub fn outlined_prims(&self) -> Vec<PrimId> {
        let mut out = Vec::new();
        if let Some(focused) = self.focused {
            out.push(focused);
        }
        if let Some(hovered) = self.hovered {
            if Some(hovered) != self.focused {
                out.push(hovered);
            }
        }
        out
    }
}
