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

//! The downward driver interface.
//!
//! [`GlDriver`] models the stateful, retained-mode object model of a GL-style
//! graphics driver: objects are identified by raw `u32` names with explicit
//! create/bind/destroy verbs, compilation success is queried together with a
//! diagnostic string, and multisample resolution happens through an explicit
//! blit. `GlBackend` is the only code that talks to this trait; everything
//! above it holds pool handles, never driver names.
//!
//! Any out-of-band call to an implementation invalidates the backend's
//! applied-state cache; `invalidate_cached_state` must be called before
//! further diffed calls are trusted.

use pyxis_core::error::DriverDiagnostic;
use pyxis_core::layout::{AttributeComponentKind, BufferUsage, IndexFormat};
use pyxis_core::state::{
    BlendFactor, ClearFlags, ColorWrites, CompareFunction, FrontFace, PrimitiveTopology, Rect,
};
use pyxis_core::target::CubeFace;
use pyxis_core::texture::TextureFormat;
use pyxis_core::UniformKind;

/// A driver-native object name. `0` is the null name (and, for framebuffers,
/// the default window-system target).
pub type GlName = u32;

/// The binding point a buffer operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Vertex data.
    Array,
    /// Index data. Note: this binding is captured by the bound vertex array.
    ElementArray,
    /// Uniform block data.
    Uniform,
}

/// A programmable shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStageKind {
    /// The vertex stage.
    Vertex,
    /// The pixel (fragment) stage.
    Fragment,
}

/// The retained-mode graphics driver contract.
///
/// Driver calls are far more expensive than a comparison in local memory;
/// the backend diffs against its applied-state cache before emitting any of
/// these. Implementations perform no diffing of their own.
pub trait GlDriver {
    // --- Buffers ---

    /// Allocates a new buffer name.
    fn create_buffer(&mut self) -> GlName;
    /// Binds `name` to the given binding point (`0` unbinds).
    fn bind_buffer(&mut self, kind: BufferKind, name: GlName);
    /// Uploads `data` into the buffer bound at `kind`, replacing its store.
    fn buffer_data(&mut self, kind: BufferKind, data: &[u8], usage: BufferUsage);
    /// Overwrites part of the buffer bound at `kind`.
    fn buffer_sub_data(&mut self, kind: BufferKind, byte_offset: u32, data: &[u8]);
    /// Destroys a buffer.
    fn delete_buffer(&mut self, name: GlName);

    // --- Vertex arrays ---

    /// Allocates a new vertex array name.
    fn create_vertex_array(&mut self) -> GlName;
    /// Binds a vertex array (`0` unbinds).
    fn bind_vertex_array(&mut self, name: GlName);
    /// Declares one attribute of the bound vertex array, sourced from the
    /// bound array buffer.
    #[allow(clippy::too_many_arguments)]
    fn vertex_attribute_pointer(
        &mut self,
        location: u32,
        component_count: u8,
        component_kind: AttributeComponentKind,
        normalized: bool,
        stride: u32,
        byte_offset: u32,
    );
    /// Destroys a vertex array.
    fn delete_vertex_array(&mut self, name: GlName);

    // --- Textures ---

    /// Allocates a new texture name.
    fn create_texture(&mut self) -> GlName;
    /// Binds a 2D texture on the active unit (`0` unbinds).
    fn bind_texture_2d(&mut self, name: GlName);
    /// Binds a cubemap texture on the active unit (`0` unbinds).
    fn bind_texture_cube(&mut self, name: GlName);
    /// Switches the active texture unit.
    fn set_active_texture_unit(&mut self, unit: u32);
    /// Uploads (or, with `data = None`, allocates) one level of the bound 2D
    /// texture.
    fn upload_texture_2d(
        &mut self,
        level: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: Option<&[u8]>,
    );
    /// Uploads (or allocates) one level of one face of the bound cubemap.
    fn upload_texture_cube_face(
        &mut self,
        face: CubeFace,
        level: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: Option<&[u8]>,
    );
    /// Generates the full mip chain of the bound 2D texture.
    fn generate_mipmaps_2d(&mut self);
    /// Generates the full mip chain of the bound cubemap.
    fn generate_mipmaps_cube(&mut self);
    /// Destroys a texture.
    fn delete_texture(&mut self, name: GlName);

    // --- Renderbuffers ---

    /// Allocates a new renderbuffer name.
    fn create_renderbuffer(&mut self) -> GlName;
    /// Allocates (multisampled) storage for a renderbuffer.
    fn renderbuffer_storage(
        &mut self,
        name: GlName,
        samples: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    );
    /// Destroys a renderbuffer.
    fn delete_renderbuffer(&mut self, name: GlName);

    // --- Framebuffers ---

    /// Allocates a new framebuffer name.
    fn create_framebuffer(&mut self) -> GlName;
    /// Binds a framebuffer for drawing (`0` = default window-system target).
    fn bind_framebuffer(&mut self, name: GlName);
    /// Attaches a 2D texture level to a color slot of the bound framebuffer.
    fn attach_color_texture(&mut self, slot: u32, texture: GlName, level: u32);
    /// Attaches one cubemap face to a color slot of the bound framebuffer.
    fn attach_color_cube_face(&mut self, slot: u32, texture: GlName, face: CubeFace, level: u32);
    /// Attaches a depth texture to the bound framebuffer.
    fn attach_depth_texture(&mut self, texture: GlName);
    /// Attaches a renderbuffer to a color slot of the bound framebuffer.
    fn attach_color_renderbuffer(&mut self, slot: u32, renderbuffer: GlName);
    /// Attaches a depth renderbuffer to the bound framebuffer.
    fn attach_depth_renderbuffer(&mut self, renderbuffer: GlName);
    /// Selects how many sequential color slots the bound framebuffer draws
    /// into; `0` disables color output (depth-only rendering).
    fn set_draw_buffers(&mut self, count: u32);
    /// Selects the color slot read-back and blits read from; `None` for
    /// depth-only targets.
    fn set_read_buffer(&mut self, slot: Option<u32>);
    /// Whether the bound framebuffer is complete.
    fn framebuffer_complete(&mut self) -> bool;
    /// Copies one color slot of `src` into one color slot of `dst`,
    /// resolving samples. Leaves the framebuffer binding undefined; the
    /// caller re-emits its binding afterwards.
    fn blit_color(
        &mut self,
        src: GlName,
        src_slot: u32,
        dst: GlName,
        dst_slot: u32,
        width: u32,
        height: u32,
    );
    /// Reads back pixels from the bound framebuffer's selected read slot.
    /// Blocks the render thread for the duration by design.
    fn read_pixels(&mut self, rect: Rect, format: TextureFormat) -> Vec<u8>;
    /// Destroys a framebuffer.
    fn delete_framebuffer(&mut self, name: GlName);

    // --- Shaders ---

    /// Compiles one shader stage. `Err` carries the compiler diagnostic.
    fn compile_stage(&mut self, kind: ShaderStageKind, source: &str) -> Result<GlName, String>;
    /// Links two compiled stages into a program. `Err` carries the linker
    /// diagnostic.
    fn link_program(&mut self, vertex: GlName, fragment: GlName) -> Result<GlName, String>;
    /// Destroys a compiled stage (safe once linked).
    fn delete_stage(&mut self, name: GlName);
    /// Destroys a program.
    fn delete_program(&mut self, name: GlName);
    /// Makes a program current (`0` unbinds).
    fn use_program(&mut self, name: GlName);
    /// The location of a named uniform, `-1` if the driver optimized it out.
    fn uniform_location(&mut self, program: GlName, name: &str) -> i32;
    /// Uploads float data to a uniform of the current program.
    fn upload_uniform_floats(
        &mut self,
        location: i32,
        kind: UniformKind,
        array_len: u32,
        data: &[f32],
    );
    /// Uploads a single integer (sampler texture unit) to the current
    /// program.
    fn upload_uniform_int(&mut self, location: i32, value: i32);
    /// Exports a program as `(driver format tag, opaque bytes)`; `None` when
    /// the driver cannot export binaries.
    fn program_binary(&mut self, program: GlName) -> Option<(u32, Vec<u8>)>;
    /// Rebuilds a program from an exported binary. `Err` carries the driver
    /// diagnostic (e.g. a stale format tag).
    fn load_program_binary(&mut self, format_tag: u32, bytes: &[u8]) -> Result<GlName, String>;

    // --- Fixed-function state ---

    /// Enables or disables blending.
    fn set_blend_enabled(&mut self, enabled: bool);
    /// Sets the source and destination blend factors.
    fn set_blend_factors(&mut self, src: BlendFactor, dst: BlendFactor);
    /// Enables or disables back-face culling.
    fn set_cull_enabled(&mut self, enabled: bool);
    /// Sets which winding order counts as front-facing.
    fn set_front_face(&mut self, order: FrontFace);
    /// Enables or disables depth testing.
    fn set_depth_test_enabled(&mut self, enabled: bool);
    /// Sets the depth comparison function.
    fn set_depth_compare(&mut self, compare: CompareFunction);
    /// Enables or disables depth writes.
    fn set_depth_write(&mut self, enabled: bool);
    /// Sets the color channel write mask.
    fn set_color_writes(&mut self, mask: ColorWrites);
    /// Sets the viewport rectangle.
    fn set_viewport(&mut self, rect: Rect);
    /// Enables or disables scissor testing.
    fn set_scissor_enabled(&mut self, enabled: bool);
    /// Sets the scissor rectangle.
    fn set_scissor(&mut self, rect: Rect);
    /// Sets the color written by color clears.
    fn set_clear_color(&mut self, color: [f32; 4]);
    /// Sets the depth written by depth clears.
    fn set_clear_depth(&mut self, depth: f32);
    /// Sets the stencil value written by stencil clears.
    fn set_clear_stencil(&mut self, stencil: u32);
    /// Clears the selected aspects of the bound framebuffer.
    fn clear(&mut self, flags: ClearFlags);

    // --- Draw submission ---

    /// Draws `count` vertices starting at `first` from the bound vertex
    /// array.
    fn draw_arrays(&mut self, topology: PrimitiveTopology, first: u32, count: u32, instances: u32);
    /// Draws `count` indices starting at `byte_offset` into the bound
    /// element buffer.
    fn draw_elements(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        byte_offset: u32,
        instances: u32,
    );
    /// Starts capturing transformed vertices.
    fn begin_transform_feedback(&mut self, topology: PrimitiveTopology);
    /// Stops capturing transformed vertices.
    fn end_transform_feedback(&mut self);

    // --- Capabilities ---

    /// The largest texture dimension the driver accepts.
    fn max_texture_dimension(&self) -> u32;
    /// The maximum number of color attachments per framebuffer.
    fn max_color_attachments(&self) -> u32;
    /// The maximum MSAA sample count.
    fn max_samples(&self) -> u32;
    /// Whether `format` is renderable/sampleable on this driver.
    fn supports_format(&self, format: TextureFormat) -> bool;
    /// Whether transform feedback is available.
    fn supports_transform_feedback(&self) -> bool;
    /// Whether programs can be exported/imported as binaries.
    fn supports_program_binaries(&self) -> bool;

    // --- Diagnostics ---

    /// Drains driver errors accumulated since the last drain.
    fn drain_errors(&mut self) -> Vec<DriverDiagnostic>;
}
