// Copyright 2025 the pyxis contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The pipeline-state aggregate and its component enums.
//!
//! [`PipelineState`] is a plain value type with no identity: engine layers
//! build a *desired* state and hand it to the backend, which diffs it against
//! the *applied* state it caches for the driver.

use crate::pool::Handle;
use crate::pyxis_bitflags;

/// The number of texture units a single draw can bind.
pub const MAX_TEXTURE_UNITS: usize = 16;

/// An integer rectangle in window coordinates (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Bottom edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Creates a rectangle from its origin and size.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A multiplier applied to the source or destination color during blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// `0.0`.
    Zero,
    /// `1.0`.
    One,
    /// The source color.
    SrcColor,
    /// One minus the source color.
    OneMinusSrcColor,
    /// The source alpha.
    SrcAlpha,
    /// One minus the source alpha.
    OneMinusSrcAlpha,
    /// The destination color.
    DstColor,
    /// One minus the destination color.
    OneMinusDstColor,
    /// The destination alpha.
    DstAlpha,
    /// One minus the destination alpha.
    OneMinusDstAlpha,
}

/// Which vertex winding order counts as "front-facing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    /// Counter-clockwise winding order is the front face.
    Ccw,
    /// Clockwise winding order is the front face.
    Cw,
}

/// The comparison function used for depth testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    /// The test never passes.
    Never,
    /// Passes if the new value is less than the existing value.
    #[default]
    Less,
    /// Passes if the new value is equal to the existing value.
    Equal,
    /// Passes if the new value is less than or equal to the existing value.
    LessEqual,
    /// Passes if the new value is greater than the existing value.
    Greater,
    /// Passes if the new value is not equal to the existing value.
    NotEqual,
    /// Passes if the new value is greater than or equal to the existing value.
    GreaterEqual,
    /// The test always passes.
    Always,
}

/// Defines how vertices are connected to form a geometric primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Isolated points.
    PointList,
    /// Isolated lines (every two vertices form a line).
    LineList,
    /// A connected line strip.
    LineStrip,
    /// Isolated triangles (every three vertices form a triangle).
    #[default]
    TriangleList,
    /// A connected triangle strip.
    TriangleStrip,
}

pyxis_bitflags! {
    /// A bitmask to enable or disable writes to individual color channels.
    pub struct ColorWrites: u8 {
        /// Enable writes to the Red channel.
        const R = 0b0001;
        /// Enable writes to the Green channel.
        const G = 0b0010;
        /// Enable writes to the Blue channel.
        const B = 0b0100;
        /// Enable writes to the Alpha channel.
        const A = 0b1000;
        /// Enable writes to all channels.
        const ALL = Self::R.bits() | Self::G.bits() | Self::B.bits() | Self::A.bits();
    }
}

pyxis_bitflags! {
    /// Which framebuffer aspects a clear operation touches.
    pub struct ClearFlags: u8 {
        /// Clear the color attachments.
        const COLOR = 0b001;
        /// Clear the depth attachment.
        const DEPTH = 0b010;
        /// Clear the stencil attachment.
        const STENCIL = 0b100;
    }
}

/// A complete description of the fixed-function and binding state for one
/// draw call.
///
/// Freely copyable; used both as the *desired* state handed to the backend
/// and as the *applied* state the backend caches. All resource references are
/// pool [`Handle`]s — `None` means "nothing bound".
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    /// The viewport rectangle.
    pub viewport: Rect,
    /// Whether scissor testing is enabled.
    pub scissor_enabled: bool,
    /// The scissor rectangle (ignored while scissor testing is disabled).
    pub scissor: Rect,
    /// RGBA color written by a color clear.
    pub clear_color: [f32; 4],
    /// Depth value written by a depth clear.
    pub clear_depth: f32,
    /// Stencil value written by a stencil clear.
    pub clear_stencil: u32,
    /// Whether blending is enabled.
    pub blend_enabled: bool,
    /// Source blend factor.
    pub blend_src: BlendFactor,
    /// Destination blend factor.
    pub blend_dst: BlendFactor,
    /// Whether back-face culling is enabled.
    pub cull_enabled: bool,
    /// Winding order that counts as front-facing.
    pub front_face: FrontFace,
    /// Whether depth testing is enabled.
    pub depth_test_enabled: bool,
    /// Depth comparison function.
    pub depth_compare: CompareFunction,
    /// Whether depth writes are enabled.
    pub depth_write: bool,
    /// Which color channels are written.
    pub color_writes: ColorWrites,
    /// The bound vertex buffer.
    pub vertex_buffer: Option<Handle>,
    /// The bound index buffer.
    pub index_buffer: Option<Handle>,
    /// The bound shader program.
    pub shader: Option<Handle>,
    /// The bound uniform buffer.
    pub uniform_buffer: Option<Handle>,
    /// The bound render target (`None` = default window-system target).
    pub render_target: Option<Handle>,
    /// How vertices are assembled into primitives.
    pub topology: PrimitiveTopology,
    /// First element of the draw range.
    pub offset: u32,
    /// Number of elements in the draw range.
    pub count: u32,
    /// Number of instances (1 for non-instanced draws).
    pub instance_count: u32,
    /// The textures bound per unit.
    pub textures: [Option<Handle>; MAX_TEXTURE_UNITS],
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            viewport: Rect::default(),
            scissor_enabled: false,
            scissor: Rect::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
            clear_stencil: 0,
            blend_enabled: false,
            blend_src: BlendFactor::One,
            blend_dst: BlendFactor::Zero,
            cull_enabled: false,
            front_face: FrontFace::Ccw,
            depth_test_enabled: false,
            depth_compare: CompareFunction::Less,
            depth_write: true,
            color_writes: ColorWrites::ALL,
            vertex_buffer: None,
            index_buffer: None,
            shader: None,
            uniform_buffer: None,
            render_target: None,
            topology: PrimitiveTopology::TriangleList,
            offset: 0,
            count: 0,
            instance_count: 1,
            textures: [None; MAX_TEXTURE_UNITS],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_self_equal() {
        assert_eq!(PipelineState::default(), PipelineState::default());
    }

    #[test]
    fn state_is_a_plain_value() {
        let mut a = PipelineState::default();
        let b = a.clone();
        a.blend_enabled = true;
        assert_ne!(a, b);
        a.blend_enabled = false;
        assert_eq!(a, b);
    }

    #[test]
    fn color_writes_default_to_all_channels() {
        let state = PipelineState::default();
        assert!(state.color_writes.contains(ColorWrites::R));
        assert!(state.color_writes.contains(ColorWrites::A));
    }
}
