//! CPU-side command recording.
//!
//! Passes record their GPU work into [`CommandRecorder`]s, which
//! accumulate backend-agnostic [`Command`] values. Secondary recorders
//! are filled in parallel across worker threads and later replayed
//! inside a primary recorder in index order; the finished primary list
//! becomes a [`Submission`] handed to the backend.

use crate::backend::{BufferHandle, QueryPoolHandle, TextureHandle};
use crate::scene::{MeshHandle, PrimId};

/// Recording level, mirroring primary/secondary command buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferLevel {
    /// Submittable; may execute secondary lists.
    Primary,
    /// Parallel-recordable; replayed by a primary.
    Secondary,
}

/// Which hardware queue a submission targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Graphics + compute queue used by the pass graph.
    Graphics,
    /// Transfer-capable queue used by upload batches.
    Transfer,
}

/// A single recorded command.
#[derive(Debug, Clone)]
pub enum Command {
    /// Begin a render or compute pass.
    BeginPass {
        /// Pass name for debugging and submission inspection.
        name: &'static str,
        /// Color attachments written by the pass.
        color: Vec<TextureHandle>,
        /// Depth attachment, if any.
        depth: Option<TextureHandle>,
    },
    /// End the current pass.
    EndPass,
    /// Bind a named pipeline.
    BindPipeline {
        /// Pipeline name (resolved by the backend's shader library).
        name: &'static str,
    },
    /// Draw one primitive's mesh.
    DrawPrim {
        /// Primitive being drawn (also the pick id written).
        prim: PrimId,
        /// Mesh geometry to draw.
        mesh: MeshHandle,
    },
    /// Draw an enlarged bounding-box proxy for one primitive
    /// (occlusion queries).
    DrawBounds {
        /// Primitive whose bounds are drawn.
        prim: PrimId,
        /// Uniform enlargement factor applied to the box.
        scale: f32,
    },
    /// Draw a fullscreen triangle (resolve/composite passes).
    DrawFullscreen,
    /// Dispatch a compute grid.
    Dispatch {
        /// Workgroups in x.
        x: u32,
        /// Workgroups in y.
        y: u32,
        /// Workgroups in z.
        z: u32,
    },
    /// Write bytes into a buffer.
    WriteBuffer {
        /// Destination buffer.
        buffer: BufferHandle,
        /// Byte offset.
        offset: u64,
        /// Payload.
        data: Vec<u8>,
    },
    /// Begin an occlusion query.
    BeginQuery {
        /// Query pool.
        pool: QueryPoolHandle,
        /// Slot within the pool.
        index: u32,
    },
    /// End an occlusion query.
    EndQuery {
        /// Query pool.
        pool: QueryPoolHandle,
        /// Slot within the pool.
        index: u32,
    },
    /// Replay secondary command lists, in the order given.
    ExecuteCommands {
        /// Finished secondary lists, primary-index order.
        lists: Vec<CommandList>,
    },
}

/// A finished, immutable sequence of commands.
#[derive(Debug, Clone, Default)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    /// The recorded commands.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of commands, counting replayed secondaries recursively.
    pub fn total_commands(&self) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                Command::ExecuteCommands { lists } => {
                    1 + lists.iter().map(CommandList::total_commands).sum::<usize>()
                }
                _ => 1,
            })
            .sum()
    }

    /// Count draws, recursing into secondaries.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                Command::DrawPrim { .. } | Command::DrawBounds { .. } | Command::DrawFullscreen => 1,
                Command::ExecuteCommands { lists } => {
                    lists.iter().map(CommandList::draw_count).sum()
                }
                _ => 0,
            })
            .sum()
    }

    /// Names of the passes begun in this list, recursing into secondaries.
    pub fn pass_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        self.collect_pass_names(&mut names);
        names
    }

    fn collect_pass_names(&self, out: &mut Vec<&'static str>) {
        for c in &self.commands {
            match c {
                Command::BeginPass { name, .. } => out.push(name),
                Command::ExecuteCommands { lists } => {
                    for list in lists {
                        list.collect_pass_names(out);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Accumulates commands for one command buffer.
#[derive(Debug)]
pub struct CommandRecorder {
    level: CommandBufferLevel,
    commands: Vec<Command>,
    open_pass: bool,
}

impl CommandRecorder {
    /// Start recording at the given level.
    pub fn new(level: CommandBufferLevel) -> Self {
        Self {
            level,
            commands: Vec::new(),
            open_pass: false,
        }
    }

    /// Recording level.
    pub fn level(&self) -> CommandBufferLevel {
        self.level
    }

    /// Begin a pass. Panics if a pass is already open.
    pub fn begin_pass(
        &mut self,
        name: &'static str,
        color: Vec<TextureHandle>,
        depth: Option<TextureHandle>,
    ) {
        assert!(!self.open_pass, "begin_pass inside an open pass");
        self.open_pass = true;
        self.commands.push(Command::BeginPass { name, color, depth });
    }

    /// End the open pass. Panics if no pass is open.
    pub fn end_pass(&mut self) {
        assert!(self.open_pass, "end_pass without begin_pass");
        self.open_pass = false;
        self.commands.push(Command::EndPass);
    }

    /// Bind a named pipeline.
    pub fn bind_pipeline(&mut self, name: &'static str) {
        self.commands.push(Command::BindPipeline { name });
    }

    /// Draw one primitive.
    pub fn draw_prim(&mut self, prim: PrimId, mesh: MeshHandle) {
        self.commands.push(Command::DrawPrim { prim, mesh });
    }

    /// Draw a primitive's bounding-box proxy, enlarged by `scale`.
    pub fn draw_bounds(&mut self, prim: PrimId, scale: f32) {
        self.commands.push(Command::DrawBounds { prim, scale });
    }

    /// Draw a fullscreen triangle.
    pub fn draw_fullscreen(&mut self) {
        self.commands.push(Command::DrawFullscreen);
    }

    /// Dispatch a compute grid.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(Command::Dispatch { x, y, z });
    }

    /// Write bytes into a buffer.
    pub fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: Vec<u8>) {
        self.commands.push(Command::WriteBuffer {
            buffer,
            offset,
            data,
        });
    }

    /// Begin an occlusion query.
    pub fn begin_query(&mut self, pool: QueryPoolHandle, index: u32) {
        self.commands.push(Command::BeginQuery { pool, index });
    }

    /// End an occlusion query.
    pub fn end_query(&mut self, pool: QueryPoolHandle, index: u32) {
        self.commands.push(Command::EndQuery { pool, index });
    }

    /// Replay finished secondary lists in index order.
    ///
    /// Only valid on a primary recorder.
    pub fn execute_commands(&mut self, lists: Vec<CommandList>) {
        assert!(
            self.level == CommandBufferLevel::Primary,
            "secondary recorders cannot replay command lists"
        );
        self.commands.push(Command::ExecuteCommands { lists });
    }

    /// Finish recording. Panics if a pass is still open.
    pub fn finish(self) -> CommandList {
        assert!(!self.open_pass, "finish with an open pass");
        CommandList {
            commands: self.commands,
        }
    }

    /// Whether anything was recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// One unit of work handed to [`GpuBackend::submit`](crate::backend::GpuBackend::submit).
#[derive(Debug, Clone)]
pub struct Submission {
    /// Debug name (e.g. "frame" or "upload-batch").
    pub name: &'static str,
    /// The primary command list.
    pub commands: CommandList,
}

impl Submission {
    /// Create a submission from a finished primary list.
    pub fn new(name: &'static str, commands: CommandList) -> Self {
        Self { name, commands }
    }
}
