//! Pass dependency graph.
//!
//! The set of passes is fixed; what varies per frame is which of them
//! run (editing passes are gated on the interaction mode) and the
//! execution order, derived from explicit inter-pass dependencies by a
//! topological sort. The sort is deterministic: among ready passes the
//! one declared first goes first, so the order is stable frame to
//! frame.

use crate::context::InteractionMode;
use crate::error::{RenderError, RenderResult};

/// Identity of a pass in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    /// Screen-space light clustering compute.
    LightClustering,
    /// Opaque geometry (color + depth + pick id).
    Opaque,
    /// Weighted blended transparency accumulate + resolve.
    Transparency,
    /// Pick-id draw and debug visualization.
    Pick,
    /// Overlay compute + wireframe/label draw.
    Overlay,
    /// Silhouette + jump-flood outline composite.
    Outline,
    /// Bounding-proxy occlusion queries for next frame.
    OcclusionQuery,
}

impl PassId {
    /// Stable pass name, used for submissions and logs.
    pub fn name(&self) -> &'static str {
        match self {
            PassId::LightClustering => "light-clustering",
            PassId::Opaque => "opaque",
            PassId::Transparency => "transparency",
            PassId::Pick => "pick",
            PassId::Overlay => "overlay",
            PassId::Outline => "outline",
            PassId::OcclusionQuery => "occlusion-query",
        }
    }
}

struct PassNode {
    id: PassId,
    deps: &'static [PassId],
    edit_only: bool,
}

/// The fixed frame graph.
pub struct PassGraph {
    nodes: Vec<PassNode>,
}

impl Default for PassGraph {
    fn default() -> Self {
        Self::standard()
    }
}

impl PassGraph {
    /// The standard seven-pass frame.
    pub fn standard() -> Self {
        Self {
            nodes: vec![
                PassNode {
                    id: PassId::LightClustering,
                    deps: &[],
                    edit_only: false,
                },
                PassNode {
                    id: PassId::Opaque,
                    deps: &[PassId::LightClustering],
                    edit_only: false,
                },
                PassNode {
                    id: PassId::Transparency,
                    deps: &[PassId::Opaque],
                    edit_only: false,
                },
                PassNode {
                    id: PassId::Pick,
                    deps: &[PassId::Opaque],
                    edit_only: true,
                },
                PassNode {
                    id: PassId::Overlay,
                    deps: &[PassId::Pick],
                    edit_only: true,
                },
                PassNode {
                    id: PassId::Outline,
                    deps: &[PassId::Overlay, PassId::Transparency],
                    edit_only: true,
                },
                PassNode {
                    id: PassId::OcclusionQuery,
                    deps: &[PassId::Outline],
                    edit_only: true,
                },
            ],
        }
    }

    /// Passes present for the given interaction mode, unsorted.
    pub fn active_passes(&self, mode: InteractionMode) -> Vec<PassId> {
        self.nodes
            .iter()
            .filter(|n| !n.edit_only || mode.is_edit_capable())
            .map(|n| n.id)
            .collect()
    }

    /// Resolve the execution order for the given mode.
    ///
    /// Dependencies on gated-out passes are ignored. An unsatisfiable
    /// graph (a cycle) is a configuration error, reported with the
    /// name of a pass on the cycle.
    pub fn compile(&self, mode: InteractionMode) -> RenderResult<Vec<PassId>> {
        let active: Vec<&PassNode> = self
            .nodes
            .iter()
            .filter(|n| !n.edit_only || mode.is_edit_capable())
            .collect();
        let present = |id: PassId| active.iter().any(|n| n.id == id);

        let mut indegree: Vec<usize> = active
            .iter()
            .map(|n| n.deps.iter().filter(|&&d| present(d)).count())
            .collect();

        let mut order = Vec::with_capacity(active.len());
        let mut emitted = vec![false; active.len()];
        while order.len() < active.len() {
            let Some(next) = (0..active.len()).find(|&i| !emitted[i] && indegree[i] == 0) else {
                let stuck = active
                    .iter()
                    .zip(&emitted)
                    .find(|(_, &e)| !e)
                    .map(|(n, _)| n.id.name())
                    .unwrap_or("unknown");
                return Err(RenderError::CyclicPassGraph { pass: stuck });
            };
            emitted[next] = true;
            order.push(active[next].id);
            for (i, node) in active.iter().enumerate() {
                if !emitted[i] && node.deps.contains(&active[next].id) {
                    indegree[i] -= 1;
                }
            }
        }
        Ok(order)
    }
}
