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

use crate::error::{DriverDiagnostic, RenderError, ResourceError};
use crate::layout::{BufferUsage, IndexFormat, VertexLayout};
use crate::pool::Handle;
use crate::shader::ShaderBindingTable;
use crate::state::{PipelineState, Rect};
use crate::target::{ColorAttachment, CubeFace, RenderTargetDescriptor, TargetBuildState};
use crate::texture::{TextureDescriptor, TextureFormat};
use glam::Mat4;

/// The abstract backend contract.
///
/// Every operation the rendering core supports, per resource kind a uniform
/// create/update/query/remove quadruplet, plus state application and draw
/// submission. All methods are synchronous and must be called from the single
/// render thread; the backend is an explicitly-owned context object, so
/// multiple independent instances can coexist (e.g. in tests).
///
/// Creation never panics and never throws: failures come back as `Err`,
/// queries against dead handles as `None`. Callers must check.
pub trait RenderBackend {
    // --- Vertex buffers ---

    /// Creates a vertex buffer from raw bytes.
    /// ## Arguments
    /// * `data` - The initial vertex bytes; must not be empty.
    /// * `layout` - How the bytes map to vertex attributes.
    /// * `vertex_count` - The number of vertices contained in `data`.
    /// * `usage` - Rewrite-frequency hint for driver memory placement.
    /// ## Returns
    /// The handle of the new buffer, or a [`ResourceError`] on empty data or
    /// driver failure.
    fn create_vertex_buffer(
        &mut self,
        data: &[u8],
        layout: &VertexLayout,
        vertex_count: u32,
        usage: BufferUsage,
    ) -> Result<Handle, ResourceError>;

    /// Overwrites part of a vertex buffer starting at `byte_offset`.
    fn update_vertex_buffer(
        &mut self,
        handle: Handle,
        data: &[u8],
        byte_offset: u32,
    ) -> Result<(), ResourceError>;

    /// The number of vertices in the buffer, or `None` for a dead handle.
    fn vertex_buffer_len(&self, handle: Handle) -> Option<u32>;

    /// Replaces the buffer's vertex layout. Invalidates any backend-side
    /// compiled binding so it is rebuilt lazily on next bind.
    fn set_vertex_layout(
        &mut self,
        handle: Handle,
        layout: &VertexLayout,
    ) -> Result<(), ResourceError>;

    /// Releases the buffer. No-op on a dead handle.
    fn remove_vertex_buffer(&mut self, handle: Handle);

    // --- Index buffers ---

    /// Creates an index buffer from raw bytes.
    /// ## Arguments
    /// * `data` - The initial index bytes; must not be empty.
    /// * `format` - 2- or 4-byte indices.
    /// * `index_count` - The number of indices contained in `data`.
    /// * `usage` - Rewrite-frequency hint.
    fn create_index_buffer(
        &mut self,
        data: &[u8],
        format: IndexFormat,
        index_count: u32,
        usage: BufferUsage,
    ) -> Result<Handle, ResourceError>;

    /// Overwrites part of an index buffer starting at `byte_offset`.
    fn update_index_buffer(
        &mut self,
        handle: Handle,
        data: &[u8],
        byte_offset: u32,
    ) -> Result<(), ResourceError>;

    /// The number of indices in the buffer, or `None` for a dead handle.
    fn index_buffer_len(&self, handle: Handle) -> Option<u32>;

    /// Releases the buffer. No-op on a dead handle.
    fn remove_index_buffer(&mut self, handle: Handle);

    // --- Uniform buffers ---

    /// Creates a uniform buffer from raw bytes.
    fn create_uniform_buffer(
        &mut self,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<Handle, ResourceError>;

    /// Overwrites part of a uniform buffer starting at `byte_offset`.
    fn update_uniform_buffer(
        &mut self,
        handle: Handle,
        data: &[u8],
        byte_offset: u32,
    ) -> Result<(), ResourceError>;

    /// The buffer size in bytes, or `None` for a dead handle.
    fn uniform_buffer_size(&self, handle: Handle) -> Option<u32>;

    /// Releases the buffer. No-op on a dead handle.
    fn remove_uniform_buffer(&mut self, handle: Handle);

    // --- Textures ---

    /// Creates a 2D texture.
    /// ## Arguments
    /// * `descriptor` - Dimensions, format and mip policy.
    /// * `data` - Base-level texels; `None` allocates storage only.
    /// ## Returns
    /// The handle of the new texture, or a [`ResourceError`] for oversized
    /// dimensions, unsupported formats, or short data.
    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Handle, ResourceError>;

    /// Re-uploads the base level of a texture.
    fn update_texture(&mut self, handle: Handle, data: &[u8]) -> Result<(), ResourceError>;

    /// The texture's descriptor, or `None` for a dead handle.
    fn texture_descriptor(&self, handle: Handle) -> Option<TextureDescriptor>;

    /// Releases the texture. Any applied-state binding of this handle is
    /// cleared so the slot cannot be aliased. No-op on a dead handle.
    fn remove_texture(&mut self, handle: Handle);

    /// Creates a cubemap; `faces` holds per-face base-level texels in
    /// [`CubeFace`](crate::target::CubeFace) index order, `None` faces are
    /// allocated storage-only.
    fn create_cubemap(
        &mut self,
        descriptor: &TextureDescriptor,
        faces: &[Option<&[u8]>; 6],
    ) -> Result<Handle, ResourceError>;

    /// Re-uploads the base level of one cubemap face.
    fn update_cubemap(
        &mut self,
        handle: Handle,
        face: CubeFace,
        data: &[u8],
    ) -> Result<(), ResourceError>;

    /// Releases the cubemap. Cubemaps share the texture pool, so this clears
    /// applied-state bindings the same way [`remove_texture`] does. No-op on
    /// a dead or non-cube handle.
    ///
    /// [`remove_texture`]: RenderBackend::remove_texture
    fn remove_cubemap(&mut self, handle: Handle);

    // --- Shaders ---

    /// Compiles and links a shader program from vertex- and pixel-stage
    /// source, then reflects its uniform and attribute declarations.
    /// ## Returns
    /// The handle of the new shader, or a [`ResourceError`] when either
    /// stage fails to compile or the program fails to link.
    fn create_shader(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Handle, ResourceError>;

    /// Sets a non-sampler uniform by name.
    ///
    /// The upload is skipped when `data` is bit-identical to the cached
    /// last-uploaded value.
    /// ## Returns
    /// `Ok(true)` if the driver upload happened, `Ok(false)` on a cache hit.
    fn set_uniform(
        &mut self,
        shader: Handle,
        name: &str,
        data: &[f32],
    ) -> Result<bool, ResourceError>;

    /// The shader's reflected binding table, or `None` for a dead handle.
    fn shader_bindings(&self, shader: Handle) -> Option<&ShaderBindingTable>;

    /// Releases the shader. No-op on a dead handle.
    fn remove_shader(&mut self, handle: Handle);

    /// Retrieves the compiled program as an opaque blob: a fixed-size
    /// driver-defined format tag followed by the raw program bytes. `None`
    /// when the driver cannot export binaries or the handle is dead.
    fn shader_binary(&mut self, shader: Handle) -> Option<Vec<u8>>;

    /// Creates a shader from a blob previously returned by
    /// [`RenderBackend::shader_binary`], skipping compilation. The sources
    /// are still required for the reflection pass; the blob itself is opaque
    /// apart from its leading format tag.
    fn create_shader_from_binary(
        &mut self,
        blob: &[u8],
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Handle, ResourceError>;

    // --- Render targets ---

    /// Registers a render target. The driver object is built lazily on first
    /// bind; sample counts above [`RenderBackend::max_target_msaa`] are
    /// clamped.
    fn create_render_target(
        &mut self,
        descriptor: RenderTargetDescriptor,
    ) -> Result<Handle, ResourceError>;

    /// Sets or clears a color attachment slot. Marks the target dirty only
    /// if the attachment actually changed.
    fn set_target_color_attachment(
        &mut self,
        target: Handle,
        slot: usize,
        attachment: Option<ColorAttachment>,
    ) -> Result<(), ResourceError>;

    /// Sets or clears the depth attachment. Marks the target dirty only on
    /// an actual change.
    fn set_target_depth_attachment(
        &mut self,
        target: Handle,
        depth: Option<Handle>,
    ) -> Result<(), ResourceError>;

    /// Resizes the target; marks it dirty if the dimensions changed.
    fn resize_target(
        &mut self,
        target: Handle,
        width: u32,
        height: u32,
    ) -> Result<(), ResourceError>;

    /// The target's descriptor, or `None` for a dead handle.
    fn target_descriptor(&self, target: Handle) -> Option<&RenderTargetDescriptor>;

    /// The target's build state, or `None` for a dead handle.
    fn target_build_state(&self, target: Handle) -> Option<TargetBuildState>;

    /// Blits each multisampled color attachment into its backing texture and
    /// regenerates mip chains for attachments that declared them. Must be
    /// invoked before binding a different target or reading back pixels,
    /// otherwise the pixels observed are stale.
    fn resolve_target(&mut self, target: Handle) -> Result<(), ResourceError>;

    /// Releases the target and its driver objects. No-op on a dead handle.
    fn remove_render_target(&mut self, handle: Handle);

    /// Reads back pixels from the bound target's read slot (or the default
    /// window-system target). Synchronous; blocks the render thread for the
    /// duration. Resolve multisampled targets first or the pixels observed
    /// are stale.
    fn read_target_pixels(&mut self, rect: Rect, format: TextureFormat) -> Vec<u8>;

    // --- Frame operations ---

    /// Stores the camera matrices used to fill the predefined matrix
    /// uniforms (MVP, model-view, projection) on every draw.
    fn set_camera(&mut self, model_view: Mat4, projection: Mat4);

    /// Clears the bound target's attachments.
    ///
    /// Runs the viewport pre-pass (target binding, viewport, clear values,
    /// scissor) from `state`, then clears whichever aspects are `Some`.
    fn clear(
        &mut self,
        state: &PipelineState,
        color: Option<[f32; 4]>,
        depth: Option<f32>,
        stencil: Option<u32>,
    );

    /// Diffs `state` against the applied-state cache and emits driver calls
    /// only for fields that differ.
    fn apply_state(&mut self, state: &PipelineState);

    /// Forces the next [`RenderBackend::apply_state`] / [`RenderBackend::clear`]
    /// to re-emit every field regardless of the cache. Required after any
    /// out-of-band driver access.
    fn invalidate_cached_state(&mut self);

    /// Submits one draw call: applies `state`, binds buffers and shader,
    /// uploads predefined matrices, and issues the driver draw.
    ///
    /// Silently returns without drawing when `state.offset + state.count`
    /// exceeds the bound buffer's element count (a defensive bound, not a
    /// reported error).
    fn draw(&mut self, state: &PipelineState) -> Result<(), RenderError>;

    /// Captures transformed vertices instead of rasterizing. Optional
    /// capability; check [`RenderBackend::is_transform_feedback_supported`].
    fn transform_feedback(&mut self, state: &PipelineState) -> Result<(), RenderError>;

    /// Whether the driver supports transform feedback.
    fn is_transform_feedback_supported(&self) -> bool;

    // --- Capability queries ---

    /// The largest texture dimension the driver accepts.
    fn max_texture_dimension(&self) -> u32;

    /// Whether the driver supports `format` for textures.
    fn is_texture_format_supported(&self, format: TextureFormat) -> bool;

    /// The maximum number of color attachments per render target.
    fn max_target_attachments(&self) -> u32;

    /// The maximum MSAA sample count for render targets.
    fn max_target_msaa(&self) -> u32;

    // --- Diagnostics ---

    /// Drains driver-level errors accumulated since the last drain. Driver
    /// errors are never surfaced per call.
    fn drain_driver_errors(&mut self) -> Vec<DriverDiagnostic>;
}
