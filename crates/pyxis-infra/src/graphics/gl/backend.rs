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

//! The concrete GL-style rendering backend.
//!
//! [`GlBackend`] owns one [`GlDriver`] plus one [`ResourcePool`] per
//! resource kind, and mediates every driver call through an applied-state
//! cache: a [`PipelineState`] mirroring what the driver currently has set,
//! compared field by field before anything is emitted. The cache is mutated
//! only after the corresponding driver call, so on a failed path it keeps
//! describing what the driver actually holds.
//!
//! Out-of-band driver access (anything not going through this type) makes
//! the cache stale; callers must follow it with
//! [`RenderBackend::invalidate_cached_state`].

use glam::Mat4;
use log::{debug, warn};
use pyxis_core::error::{DriverDiagnostic, RenderError, ResourceError, ShaderError};
use pyxis_core::layout::{BufferUsage, IndexFormat, VertexLayout};
use pyxis_core::pool::{Handle, ResourcePool};
use pyxis_core::shader::{PredefinedMatrix, ShaderBindingTable};
use pyxis_core::state::{ClearFlags, PipelineState, Rect, MAX_TEXTURE_UNITS};
use pyxis_core::target::{
    ColorAttachment, CubeFace, RenderTargetDescriptor, TargetBuildState,
};
use pyxis_core::texture::{MipPolicy, TextureDescriptor, TextureFormat};
use pyxis_core::traits::RenderBackend;

use super::driver::{BufferKind, GlDriver, GlName};
use super::shader::{compile_program, reflect_program};
use super::target::{self, TargetResource};

/// Which driver binding point a texture lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextureBinding {
    TwoD,
    Cube,
}

/// Driver-side incarnation of one texture.
pub(crate) struct TextureResource {
    pub texture: GlName,
    pub descriptor: TextureDescriptor,
    pub binding: TextureBinding,
}

struct VertexBufferResource {
    buffer: GlName,
    layout: VertexLayout,
    vertex_count: u32,
    byte_len: u32,
    /// The compiled attribute binding, built lazily on first draw and keyed
    /// on the layout revision.
    vertex_array: GlName,
    built_revision: u64,
}

struct IndexBufferResource {
    buffer: GlName,
    format: IndexFormat,
    index_count: u32,
    byte_len: u32,
}

struct UniformBufferResource {
    buffer: GlName,
    byte_len: u32,
}

struct ShaderResource {
    program: GlName,
    bindings: ShaderBindingTable,
}

/// Mirror of the driver's current state. `pipeline` holds the diffable
/// fields; the raw names track driver objects the pipeline state only knows
/// by handle.
struct AppliedState {
    pipeline: PipelineState,
    /// When set, the next full state application re-emits every field.
    force_all: bool,
    vertex_array: GlName,
    framebuffer: GlName,
    program: GlName,
    active_texture_unit: u32,
}

impl AppliedState {
    fn new() -> Self {
        Self {
            pipeline: PipelineState::default(),
            force_all: true,
            vertex_array: 0,
            framebuffer: 0,
            program: 0,
            active_texture_unit: 0,
        }
    }
}

/// The concrete backend. See the module docs.
pub struct GlBackend<D: GlDriver> {
    driver: D,
    vertex_buffers: ResourcePool<VertexBufferResource>,
    index_buffers: ResourcePool<IndexBufferResource>,
    uniform_buffers: ResourcePool<UniformBufferResource>,
    textures: ResourcePool<TextureResource>,
    shaders: ResourcePool<ShaderResource>,
    targets: ResourcePool<TargetResource>,
    applied: AppliedState,
    model_view: Mat4,
    projection: Mat4,
}

impl<D: GlDriver> GlBackend<D> {
    /// Wraps a driver. The first state application emits every field, since
    /// nothing is known about the driver's current settings.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            vertex_buffers: ResourcePool::new(),
            index_buffers: ResourcePool::new(),
            uniform_buffers: ResourcePool::new(),
            textures: ResourcePool::new(),
            shaders: ResourcePool::new(),
            targets: ResourcePool::new(),
            applied: AppliedState::new(),
            model_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }

    /// The wrapped driver, for inspection.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the wrapped driver. Any state-changing call made
    /// through this bypasses the applied-state cache; follow it with
    /// [`RenderBackend::invalidate_cached_state`].
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Tears down every live resource and returns the driver.
    pub fn into_driver(mut self) -> D {
        let driver = &mut self.driver;
        self.vertex_buffers.drain_with(|vb| {
            if vb.vertex_array != 0 {
                driver.delete_vertex_array(vb.vertex_array);
            }
            driver.delete_buffer(vb.buffer);
        });
        self.index_buffers.drain_with(|ib| driver.delete_buffer(ib.buffer));
        self.uniform_buffers.drain_with(|ub| driver.delete_buffer(ub.buffer));
        self.textures.drain_with(|t| driver.delete_texture(t.texture));
        self.shaders.drain_with(|s| driver.delete_program(s.program));
        self.targets.drain_with(|mut t| target::destroy(driver, &mut t));
        self.driver
    }

    /// Binds the requested render target, (re)building its driver object
    /// when its descriptor changed since the last build.
    fn bind_render_target(&mut self, desired: Option<Handle>, force: bool) {
        match desired {
            None => {
                if force || self.applied.framebuffer != 0 {
                    self.driver.bind_framebuffer(0);
                    self.applied.framebuffer = 0;
                }
            }
            Some(handle) => {
                let needs_build = match self.targets.get(handle) {
                    Some(t) => t.build != TargetBuildState::Clean,
                    None => {
                        warn!("render target handle is dead; binding the default target");
                        if force || self.applied.framebuffer != 0 {
                            self.driver.bind_framebuffer(0);
                            self.applied.framebuffer = 0;
                        }
                        self.applied.pipeline.render_target = None;
                        return;
                    }
                };
                if needs_build {
                    let target = match self.targets.get_mut(handle) {
                        Some(t) => t,
                        None => return,
                    };
                    // If the stale incarnation is what the driver is
                    // currently rendering to, pull its pixels out before
                    // tearing it down.
                    if target.framebuffer != 0
                        && self.applied.framebuffer == target.draw_framebuffer()
                    {
                        target::resolve(&mut self.driver, &self.textures, target);
                        let unit = self.applied.active_texture_unit as usize;
                        self.applied.pipeline.textures[unit] = None;
                    }
                    target::destroy(&mut self.driver, target);
                    let bound = target::build(&mut self.driver, &self.textures, target);
                    self.applied.framebuffer = bound;
                }
                if let Some(target) = self.targets.get(handle) {
                    let draw = target.draw_framebuffer();
                    if force || self.applied.framebuffer != draw {
                        self.driver.bind_framebuffer(draw);
                        self.applied.framebuffer = draw;
                    }
                }
            }
        }
        self.applied.pipeline.render_target = desired;
    }

    /// The viewport pre-pass shared by clears and draws: target binding,
    /// viewport, scissor. Clear values go through [`apply_clear_values`] so
    /// `clear` can substitute its per-call overrides.
    ///
    /// [`apply_clear_values`]: GlBackend::apply_clear_values
    fn apply_viewport_state(&mut self, state: &PipelineState, force: bool) {
        let target_dirty = !force
            && state.render_target == self.applied.pipeline.render_target
            && state
                .render_target
                .and_then(|h| self.targets.get(h))
                .is_some_and(|t| t.build != TargetBuildState::Clean);
        if force || target_dirty || state.render_target != self.applied.pipeline.render_target {
            self.bind_render_target(state.render_target, force);
        }
        if force || state.viewport != self.applied.pipeline.viewport {
            self.driver.set_viewport(state.viewport);
            self.applied.pipeline.viewport = state.viewport;
        }
        if force || state.scissor_enabled != self.applied.pipeline.scissor_enabled {
            self.driver.set_scissor_enabled(state.scissor_enabled);
            self.applied.pipeline.scissor_enabled = state.scissor_enabled;
        }
        if force || state.scissor != self.applied.pipeline.scissor {
            self.driver.set_scissor(state.scissor);
            self.applied.pipeline.scissor = state.scissor;
        }
    }

    /// Diffs the clear values against the cache. Both the regular state
    /// application and `clear`'s per-call overrides route through here, so
    /// the two paths never fight over the same cache fields.
    fn apply_clear_values(&mut self, color: [f32; 4], depth: f32, stencil: u32, force: bool) {
        if force || color != self.applied.pipeline.clear_color {
            self.driver.set_clear_color(color);
            self.applied.pipeline.clear_color = color;
        }
        if force || depth != self.applied.pipeline.clear_depth {
            self.driver.set_clear_depth(depth);
            self.applied.pipeline.clear_depth = depth;
        }
        if force || stencil != self.applied.pipeline.clear_stencil {
            self.driver.set_clear_stencil(stencil);
            self.applied.pipeline.clear_stencil = stencil;
        }
    }

    /// Diffs the rasterizer and texture-binding fields.
    fn apply_pipeline_fields(&mut self, state: &PipelineState, force: bool) {
        if force || state.blend_enabled != self.applied.pipeline.blend_enabled {
            self.driver.set_blend_enabled(state.blend_enabled);
            self.applied.pipeline.blend_enabled = state.blend_enabled;
        }
        if force
            || state.blend_src != self.applied.pipeline.blend_src
            || state.blend_dst != self.applied.pipeline.blend_dst
        {
            self.driver.set_blend_factors(state.blend_src, state.blend_dst);
            self.applied.pipeline.blend_src = state.blend_src;
            self.applied.pipeline.blend_dst = state.blend_dst;
        }
        if force || state.cull_enabled != self.applied.pipeline.cull_enabled {
            self.driver.set_cull_enabled(state.cull_enabled);
            self.applied.pipeline.cull_enabled = state.cull_enabled;
        }
        if force || state.front_face != self.applied.pipeline.front_face {
            self.driver.set_front_face(state.front_face);
            self.applied.pipeline.front_face = state.front_face;
        }
        if force || state.depth_test_enabled != self.applied.pipeline.depth_test_enabled {
            self.driver.set_depth_test_enabled(state.depth_test_enabled);
            self.applied.pipeline.depth_test_enabled = state.depth_test_enabled;
        }
        if force || state.depth_compare != self.applied.pipeline.depth_compare {
            self.driver.set_depth_compare(state.depth_compare);
            self.applied.pipeline.depth_compare = state.depth_compare;
        }
        if force || state.depth_write != self.applied.pipeline.depth_write {
            self.driver.set_depth_write(state.depth_write);
            self.applied.pipeline.depth_write = state.depth_write;
        }
        if force || state.color_writes != self.applied.pipeline.color_writes {
            self.driver.set_color_writes(state.color_writes);
            self.applied.pipeline.color_writes = state.color_writes;
        }

        // Layer activation is itself diffed; after an invalidation the first
        // visited unit re-emits it once. A forced pass still skips units
        // that are unbound on both sides, so the active unit is not dragged
        // through all sixteen slots.
        let mut unit_force = force;
        for unit in 0..MAX_TEXTURE_UNITS {
            if force {
                if state.textures[unit].is_none() && self.applied.pipeline.textures[unit].is_none()
                {
                    continue;
                }
            } else if state.textures[unit] == self.applied.pipeline.textures[unit] {
                continue;
            }
            self.activate_texture_unit(unit as u32, &mut unit_force);
            match state.textures[unit] {
                Some(handle) => match self.textures.get(handle) {
                    Some(texture) => match texture.binding {
                        TextureBinding::TwoD => self.driver.bind_texture_2d(texture.texture),
                        TextureBinding::Cube => self.driver.bind_texture_cube(texture.texture),
                    },
                    None => {
                        warn!("texture bound on unit {unit} is dead; unbinding");
                        self.driver.bind_texture_2d(0);
                    }
                },
                None => self.driver.bind_texture_2d(0),
            }
            self.applied.pipeline.textures[unit] = state.textures[unit];
        }
    }

    fn activate_texture_unit(&mut self, unit: u32, force: &mut bool) {
        if *force || unit != self.applied.active_texture_unit {
            self.driver.set_active_texture_unit(unit);
            self.applied.active_texture_unit = unit;
            *force = false;
        }
    }

    /// Fills whichever of the reserved matrix uniforms the shader declares,
    /// routed through the uniform cache like any other upload.
    fn upload_predefined_matrices(&mut self, shader: Handle) {
        let mvp = self.projection * self.model_view;
        let values = [
            (PredefinedMatrix::ModelViewProjection, mvp),
            (PredefinedMatrix::ModelView, self.model_view),
            (PredefinedMatrix::Projection, self.projection),
        ];
        let Some(resource) = self.shaders.get_mut(shader) else {
            return;
        };
        for (slot, matrix) in values {
            if resource.bindings.predefined(slot).is_none() {
                continue;
            }
            let Some(index) = resource.bindings.uniform_index(slot.reserved_name()) else {
                continue;
            };
            let data = matrix.to_cols_array();
            match resource.bindings.update_cache(index, &data) {
                Ok(true) => {
                    let descriptor = &resource.bindings.uniforms()[index];
                    if descriptor.location >= 0 {
                        self.driver.upload_uniform_floats(
                            descriptor.location,
                            descriptor.kind,
                            descriptor.array_len,
                            &data,
                        );
                    }
                }
                Ok(false) => {}
                Err(err) => warn!("predefined matrix upload failed: {err}"),
            }
        }
    }

    /// Registers a linked program: assigns texture units to its samplers and
    /// acquires a pool slot.
    fn finish_shader(
        &mut self,
        program: GlName,
        bindings: ShaderBindingTable,
    ) -> Result<Handle, ResourceError> {
        let sampler_units: Vec<(i32, u32)> = bindings
            .uniforms()
            .iter()
            .filter_map(|u| u.texture_unit.map(|unit| (u.location, unit)))
            .collect();
        if !sampler_units.is_empty() {
            self.driver.use_program(program);
            self.applied.program = program;
            for (location, unit) in sampler_units {
                if unit as usize >= MAX_TEXTURE_UNITS {
                    warn!("shader declares more samplers than the {MAX_TEXTURE_UNITS} supported texture units");
                }
                if location >= 0 {
                    self.driver.upload_uniform_int(location, unit as i32);
                }
            }
        }
        Ok(self.shaders.acquire(ShaderResource { program, bindings }))
    }

    fn validate_texture(&self, descriptor: &TextureDescriptor) -> Result<(), ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(ResourceError::InvalidDescriptor(
                "texture dimensions must be nonzero".into(),
            ));
        }
        let max = self.driver.max_texture_dimension();
        if descriptor.width > max || descriptor.height > max {
            return Err(ResourceError::InvalidDescriptor(format!(
                "texture dimensions {}x{} exceed the driver maximum {max}",
                descriptor.width, descriptor.height
            )));
        }
        if !self.driver.supports_format(descriptor.format) {
            return Err(ResourceError::UnsupportedFormat);
        }
        Ok(())
    }

    /// Allocates the non-base levels implied by the mip policy; full chains
    /// are generated instead once base data is in place.
    fn allocate_texture_levels(&mut self, descriptor: &TextureDescriptor, has_data: bool) {
        match (descriptor.mips, descriptor.width, descriptor.height) {
            (MipPolicy::None, ..) => {}
            (MipPolicy::FullChain, ..) => {
                if has_data {
                    self.driver.generate_mipmaps_2d();
                }
            }
            (MipPolicy::Levels(levels), mut width, mut height) => {
                for level in 1..levels {
                    width = (width / 2).max(1);
                    height = (height / 2).max(1);
                    self.driver
                        .upload_texture_2d(level, width, height, descriptor.format, None);
                }
            }
        }
    }

    /// Submits one draw after full state application, optionally wrapped in
    /// transform feedback capture.
    fn submit(&mut self, state: &PipelineState, feedback: bool) -> Result<(), RenderError> {
        let force = self.applied.force_all;
        self.apply_viewport_state(state, force);
        self.apply_clear_values(state.clear_color, state.clear_depth, state.clear_stencil, force);
        self.apply_pipeline_fields(state, force);
        self.applied.force_all = false;

        let Some(shader_handle) = state.shader else {
            debug!("draw skipped: no shader bound");
            return Ok(());
        };
        let program = match self.shaders.get(shader_handle) {
            Some(shader) => shader.program,
            None => {
                warn!("draw skipped: shader handle is dead");
                return Ok(());
            }
        };
        if force || program != self.applied.program {
            self.driver.use_program(program);
            self.applied.program = program;
        }
        self.applied.pipeline.shader = state.shader;

        self.upload_predefined_matrices(shader_handle);

        if force || state.uniform_buffer != self.applied.pipeline.uniform_buffer {
            let name = state
                .uniform_buffer
                .and_then(|h| self.uniform_buffers.get(h))
                .map_or(0, |ub| ub.buffer);
            self.driver.bind_buffer(BufferKind::Uniform, name);
            self.applied.pipeline.uniform_buffer = state.uniform_buffer;
        }

        let Some(vb_handle) = state.vertex_buffer else {
            debug!("draw skipped: no vertex buffer bound");
            return Ok(());
        };
        let index = match state.index_buffer {
            Some(handle) => match self.index_buffers.get(handle) {
                Some(ib) => Some((ib.buffer, ib.format, ib.index_count)),
                None => {
                    warn!("draw skipped: index buffer handle is dead");
                    return Ok(());
                }
            },
            None => None,
        };

        let vertex_count;
        let rebuilt;
        {
            let Some(vb) = self.vertex_buffers.get_mut(vb_handle) else {
                warn!("draw skipped: vertex buffer handle is dead");
                return Ok(());
            };
            vertex_count = vb.vertex_count;
            rebuilt = vb.vertex_array == 0 || vb.built_revision != vb.layout.revision();
            if rebuilt {
                if vb.vertex_array != 0 {
                    self.driver.delete_vertex_array(vb.vertex_array);
                }
                let vertex_array = self.driver.create_vertex_array();
                self.driver.bind_vertex_array(vertex_array);
                self.driver.bind_buffer(BufferKind::Array, vb.buffer);
                for attribute in vb.layout.attributes() {
                    self.driver.vertex_attribute_pointer(
                        attribute.kind.shader_location(),
                        attribute.component_count,
                        attribute.component_kind,
                        attribute.component_kind.is_normalized(),
                        vb.layout.stride(),
                        attribute.offset,
                    );
                }
                vb.vertex_array = vertex_array;
                vb.built_revision = vb.layout.revision();
                self.applied.vertex_array = vertex_array;
                // The fresh vertex array has no element binding yet.
                self.applied.pipeline.index_buffer = None;
            } else if force || self.applied.vertex_array != vb.vertex_array {
                self.driver.bind_vertex_array(vb.vertex_array);
                self.applied.vertex_array = vb.vertex_array;
            }
        }
        self.applied.pipeline.vertex_buffer = state.vertex_buffer;

        if let Some((buffer, ..)) = index {
            if rebuilt || force || state.index_buffer != self.applied.pipeline.index_buffer {
                self.driver.bind_buffer(BufferKind::ElementArray, buffer);
                self.applied.pipeline.index_buffer = state.index_buffer;
            }
        }

        let available = index.map_or(vertex_count, |(_, _, count)| count);
        let end = match state.offset.checked_add(state.count) {
            Some(end) if end <= available => end,
            _ => {
                debug!(
                    "draw skipped: range {}+{} exceeds {available} elements",
                    state.offset, state.count
                );
                return Ok(());
            }
        };
        if end == state.offset {
            return Ok(());
        }
        let instances = state.instance_count.max(1);
        if feedback {
            self.driver.begin_transform_feedback(state.topology);
        }
        match index {
            Some((_, format, _)) => self.driver.draw_elements(
                state.topology,
                state.count,
                format,
                state.offset * format.size(),
                instances,
            ),
            None => self
                .driver
                .draw_arrays(state.topology, state.offset, state.count, instances),
        }
        if feedback {
            self.driver.end_transform_feedback();
        }
        self.applied.pipeline.topology = state.topology;
        self.applied.pipeline.offset = state.offset;
        self.applied.pipeline.count = state.count;
        self.applied.pipeline.instance_count = state.instance_count;
        Ok(())
    }
}

impl<D: GlDriver> RenderBackend for GlBackend<D> {
    fn create_vertex_buffer(
        &mut self,
        data: &[u8],
        layout: &VertexLayout,
        vertex_count: u32,
        usage: BufferUsage,
    ) -> Result<Handle, ResourceError> {
        if data.is_empty() {
            return Err(ResourceError::InvalidDescriptor(
                "vertex buffer created with no data".into(),
            ));
        }
        let buffer = self.driver.create_buffer();
        self.driver.bind_buffer(BufferKind::Array, buffer);
        self.driver.buffer_data(BufferKind::Array, data, usage);
        Ok(self.vertex_buffers.acquire(VertexBufferResource {
            buffer,
            layout: layout.clone(),
            vertex_count,
            byte_len: data.len() as u32,
            vertex_array: 0,
            built_revision: 0,
        }))
    }

    fn update_vertex_buffer(
        &mut self,
        handle: Handle,
        data: &[u8],
        byte_offset: u32,
    ) -> Result<(), ResourceError> {
        let Some(vb) = self.vertex_buffers.get(handle) else {
            return Err(ResourceError::InvalidHandle);
        };
        if byte_offset as usize + data.len() > vb.byte_len as usize {
            return Err(ResourceError::OutOfBounds);
        }
        self.driver.bind_buffer(BufferKind::Array, vb.buffer);
        self.driver
            .buffer_sub_data(BufferKind::Array, byte_offset, data);
        Ok(())
    }

    fn vertex_buffer_len(&self, handle: Handle) -> Option<u32> {
        self.vertex_buffers.get(handle).map(|vb| vb.vertex_count)
    }

    fn set_vertex_layout(
        &mut self,
        handle: Handle,
        layout: &VertexLayout,
    ) -> Result<(), ResourceError> {
        let Some(vb) = self.vertex_buffers.get_mut(handle) else {
            return Err(ResourceError::InvalidHandle);
        };
        vb.layout = layout.clone();
        if vb.vertex_array != 0 {
            self.driver.delete_vertex_array(vb.vertex_array);
            if self.applied.vertex_array == vb.vertex_array {
                self.applied.vertex_array = 0;
            }
            vb.vertex_array = 0;
        }
        Ok(())
    }

    fn remove_vertex_buffer(&mut self, handle: Handle) {
        if let Some(vb) = self.vertex_buffers.release(handle) {
            if vb.vertex_array != 0 {
                self.driver.delete_vertex_array(vb.vertex_array);
                if self.applied.vertex_array == vb.vertex_array {
                    self.applied.vertex_array = 0;
                }
            }
            self.driver.delete_buffer(vb.buffer);
            if self.applied.pipeline.vertex_buffer == Some(handle) {
                self.applied.pipeline.vertex_buffer = None;
            }
        }
    }

    fn create_index_buffer(
        &mut self,
        data: &[u8],
        format: IndexFormat,
        index_count: u32,
        usage: BufferUsage,
    ) -> Result<Handle, ResourceError> {
        if data.is_empty() {
            return Err(ResourceError::InvalidDescriptor(
                "index buffer created with no data".into(),
            ));
        }
        // The element binding point is captured by the bound vertex array;
        // unbind it so resource creation cannot corrupt a live binding.
        if self.applied.vertex_array != 0 {
            self.driver.bind_vertex_array(0);
            self.applied.vertex_array = 0;
        }
        let buffer = self.driver.create_buffer();
        self.driver.bind_buffer(BufferKind::ElementArray, buffer);
        self.driver.buffer_data(BufferKind::ElementArray, data, usage);
        Ok(self.index_buffers.acquire(IndexBufferResource {
            buffer,
            format,
            index_count,
            byte_len: data.len() as u32,
        }))
    }

    fn update_index_buffer(
        &mut self,
        handle: Handle,
        data: &[u8],
        byte_offset: u32,
    ) -> Result<(), ResourceError> {
        let Some(ib) = self.index_buffers.get(handle) else {
            return Err(ResourceError::InvalidHandle);
        };
        if byte_offset as usize + data.len() > ib.byte_len as usize {
            return Err(ResourceError::OutOfBounds);
        }
        let buffer = ib.buffer;
        if self.applied.vertex_array != 0 {
            self.driver.bind_vertex_array(0);
            self.applied.vertex_array = 0;
        }
        self.driver.bind_buffer(BufferKind::ElementArray, buffer);
        self.driver
            .buffer_sub_data(BufferKind::ElementArray, byte_offset, data);
        Ok(())
    }

    fn index_buffer_len(&self, handle: Handle) -> Option<u32> {
        self.index_buffers.get(handle).map(|ib| ib.index_count)
    }

    fn remove_index_buffer(&mut self, handle: Handle) {
        if let Some(ib) = self.index_buffers.release(handle) {
            self.driver.delete_buffer(ib.buffer);
            if self.applied.pipeline.index_buffer == Some(handle) {
                self.applied.pipeline.index_buffer = None;
            }
        }
    }

    fn create_uniform_buffer(
        &mut self,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<Handle, ResourceError> {
        if data.is_empty() {
            return Err(ResourceError::InvalidDescriptor(
                "uniform buffer created with no data".into(),
            ));
        }
        let buffer = self.driver.create_buffer();
        self.driver.bind_buffer(BufferKind::Uniform, buffer);
        self.driver.buffer_data(BufferKind::Uniform, data, usage);
        let handle = self.uniform_buffers.acquire(UniformBufferResource {
            buffer,
            byte_len: data.len() as u32,
        });
        // The upload left this buffer bound at the uniform binding point.
        self.applied.pipeline.uniform_buffer = Some(handle);
        Ok(handle)
    }

    fn update_uniform_buffer(
        &mut self,
        handle: Handle,
        data: &[u8],
        byte_offset: u32,
    ) -> Result<(), ResourceError> {
        let Some(ub) = self.uniform_buffers.get(handle) else {
            return Err(ResourceError::InvalidHandle);
        };
        if byte_offset as usize + data.len() > ub.byte_len as usize {
            return Err(ResourceError::OutOfBounds);
        }
        self.driver.bind_buffer(BufferKind::Uniform, ub.buffer);
        self.driver
            .buffer_sub_data(BufferKind::Uniform, byte_offset, data);
        self.applied.pipeline.uniform_buffer = Some(handle);
        Ok(())
    }

    fn uniform_buffer_size(&self, handle: Handle) -> Option<u32> {
        self.uniform_buffers.get(handle).map(|ub| ub.byte_len)
    }

    fn remove_uniform_buffer(&mut self, handle: Handle) {
        if let Some(ub) = self.uniform_buffers.release(handle) {
            self.driver.delete_buffer(ub.buffer);
            if self.applied.pipeline.uniform_buffer == Some(handle) {
                self.applied.pipeline.uniform_buffer = None;
            }
        }
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Handle, ResourceError> {
        self.validate_texture(descriptor)?;
        if let Some(data) = data {
            if data.len() < descriptor.base_level_size() {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "texture data holds {} bytes, base level needs {}",
                    data.len(),
                    descriptor.base_level_size()
                )));
            }
        }
        let texture = self.driver.create_texture();
        self.driver.bind_texture_2d(texture);
        self.driver.upload_texture_2d(
            0,
            descriptor.width,
            descriptor.height,
            descriptor.format,
            data,
        );
        self.allocate_texture_levels(descriptor, data.is_some());
        let handle = self.textures.acquire(TextureResource {
            texture,
            descriptor: *descriptor,
            binding: TextureBinding::TwoD,
        });
        // The upload left this texture bound on the active unit.
        self.applied.pipeline.textures[self.applied.active_texture_unit as usize] = Some(handle);
        Ok(handle)
    }

    fn update_texture(&mut self, handle: Handle, data: &[u8]) -> Result<(), ResourceError> {
        let Some(texture) = self.textures.get(handle) else {
            return Err(ResourceError::InvalidHandle);
        };
        if texture.binding != TextureBinding::TwoD {
            return Err(ResourceError::InvalidDescriptor(
                "cubemap faces are updated through update_cubemap".into(),
            ));
        }
        if data.len() < texture.descriptor.base_level_size() {
            return Err(ResourceError::InvalidDescriptor(format!(
                "texture data holds {} bytes, base level needs {}",
                data.len(),
                texture.descriptor.base_level_size()
            )));
        }
        let descriptor = texture.descriptor;
        let name = texture.texture;
        self.driver.bind_texture_2d(name);
        self.driver.upload_texture_2d(
            0,
            descriptor.width,
            descriptor.height,
            descriptor.format,
            Some(data),
        );
        if descriptor.mips == MipPolicy::FullChain {
            self.driver.generate_mipmaps_2d();
        }
        self.applied.pipeline.textures[self.applied.active_texture_unit as usize] = Some(handle);
        Ok(())
    }

    fn texture_descriptor(&self, handle: Handle) -> Option<TextureDescriptor> {
        self.textures.get(handle).map(|t| t.descriptor)
    }

    fn remove_texture(&mut self, handle: Handle) {
        if let Some(texture) = self.textures.release(handle) {
            self.driver.delete_texture(texture.texture);
            // Deleting a texture unbinds it driver-side on every unit.
            for slot in self.applied.pipeline.textures.iter_mut() {
                if *slot == Some(handle) {
                    *slot = None;
                }
            }
        }
    }

    fn create_cubemap(
        &mut self,
        descriptor: &TextureDescriptor,
        faces: &[Option<&[u8]>; 6],
    ) -> Result<Handle, ResourceError> {
        self.validate_texture(descriptor)?;
        if descriptor.width != descriptor.height {
            return Err(ResourceError::InvalidDescriptor(
                "cubemap faces must be square".into(),
            ));
        }
        for data in faces.iter().flatten() {
            if data.len() < descriptor.base_level_size() {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "cubemap face holds {} bytes, base level needs {}",
                    data.len(),
                    descriptor.base_level_size()
                )));
            }
        }
        const FACES: [CubeFace; 6] = [
            CubeFace::PositiveX,
            CubeFace::NegativeX,
            CubeFace::PositiveY,
            CubeFace::NegativeY,
            CubeFace::PositiveZ,
            CubeFace::NegativeZ,
        ];
        let texture = self.driver.create_texture();
        self.driver.bind_texture_cube(texture);
        for face in FACES {
            self.driver.upload_texture_cube_face(
                face,
                0,
                descriptor.width,
                descriptor.height,
                descriptor.format,
                faces[face.index() as usize],
            );
        }
        if descriptor.mips == MipPolicy::FullChain && faces.iter().any(Option::is_some) {
            self.driver.generate_mipmaps_cube();
        }
        let handle = self.textures.acquire(TextureResource {
            texture,
            descriptor: *descriptor,
            binding: TextureBinding::Cube,
        });
        self.applied.pipeline.textures[self.applied.active_texture_unit as usize] = Some(handle);
        Ok(handle)
    }

    fn update_cubemap(
        &mut self,
        handle: Handle,
        face: CubeFace,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let Some(texture) = self.textures.get(handle) else {
            return Err(ResourceError::InvalidHandle);
        };
        if texture.binding != TextureBinding::Cube {
            return Err(ResourceError::InvalidDescriptor(
                "handle does not name a cubemap".into(),
            ));
        }
        if data.len() < texture.descriptor.base_level_size() {
            return Err(ResourceError::InvalidDescriptor(format!(
                "cubemap face holds {} bytes, base level needs {}",
                data.len(),
                texture.descriptor.base_level_size()
            )));
        }
        let descriptor = texture.descriptor;
        let name = texture.texture;
        self.driver.bind_texture_cube(name);
        self.driver.upload_texture_cube_face(
            face,
            0,
            descriptor.width,
            descriptor.height,
            descriptor.format,
            Some(data),
        );
        if descriptor.mips == MipPolicy::FullChain {
            self.driver.generate_mipmaps_cube();
        }
        self.applied.pipeline.textures[self.applied.active_texture_unit as usize] = Some(handle);
        Ok(())
    }

    fn remove_cubemap(&mut self, handle: Handle) {
        if self
            .textures
            .get(handle)
            .is_some_and(|t| t.binding == TextureBinding::Cube)
        {
            self.remove_texture(handle);
        }
    }

    fn create_shader(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Handle, ResourceError> {
        let program = compile_program(&mut self.driver, vertex_src, fragment_src)
            .map_err(ResourceError::Shader)?;
        let bindings =
            match reflect_program(&mut self.driver, program, vertex_src, fragment_src) {
                Ok(table) => table,
                Err(err) => {
                    self.driver.delete_program(program);
                    return Err(ResourceError::Shader(err));
                }
            };
        self.finish_shader(program, bindings)
    }

    fn set_uniform(
        &mut self,
        shader: Handle,
        name: &str,
        data: &[f32],
    ) -> Result<bool, ResourceError> {
        let Some(resource) = self.shaders.get_mut(shader) else {
            return Err(ResourceError::InvalidHandle);
        };
        let Some(index) = resource.bindings.uniform_index(name) else {
            return Err(ResourceError::Shader(ShaderError::UnknownUniform {
                name: name.into(),
            }));
        };
        let changed = resource
            .bindings
            .update_cache(index, data)
            .map_err(ResourceError::Shader)?;
        if changed {
            let descriptor = &resource.bindings.uniforms()[index];
            if descriptor.location >= 0 {
                if self.applied.program != resource.program {
                    self.driver.use_program(resource.program);
                    self.applied.program = resource.program;
                }
                self.driver.upload_uniform_floats(
                    descriptor.location,
                    descriptor.kind,
                    descriptor.array_len,
                    data,
                );
            }
        }
        Ok(changed)
    }

    fn shader_bindings(&self, shader: Handle) -> Option<&ShaderBindingTable> {
        self.shaders.get(shader).map(|s| &s.bindings)
    }

    fn remove_shader(&mut self, handle: Handle) {
        if let Some(shader) = self.shaders.release(handle) {
            self.driver.delete_program(shader.program);
            if self.applied.pipeline.shader == Some(handle) {
                self.applied.pipeline.shader = None;
            }
        }
    }

    fn shader_binary(&mut self, shader: Handle) -> Option<Vec<u8>> {
        let program = self.shaders.get(shader)?.program;
        let (format_tag, bytes) = self.driver.program_binary(program)?;
        let mut blob = Vec::with_capacity(4 + bytes.len());
        blob.extend_from_slice(&format_tag.to_le_bytes());
        blob.extend_from_slice(&bytes);
        Some(blob)
    }

    fn create_shader_from_binary(
        &mut self,
        blob: &[u8],
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Handle, ResourceError> {
        if blob.len() < 4 {
            return Err(ResourceError::Shader(ShaderError::BinaryLoadError {
                format_tag: 0,
            }));
        }
        let format_tag = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]);
        let program = self
            .driver
            .load_program_binary(format_tag, &blob[4..])
            .map_err(|details| {
                debug!("program binary rejected: {details}");
                ResourceError::Shader(ShaderError::BinaryLoadError { format_tag })
            })?;
        let bindings =
            match reflect_program(&mut self.driver, program, vertex_src, fragment_src) {
                Ok(table) => table,
                Err(err) => {
                    self.driver.delete_program(program);
                    return Err(ResourceError::Shader(err));
                }
            };
        self.finish_shader(program, bindings)
    }

    fn create_render_target(
        &mut self,
        descriptor: RenderTargetDescriptor,
    ) -> Result<Handle, ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(ResourceError::InvalidDescriptor(
                "render target dimensions must be nonzero".into(),
            ));
        }
        if descriptor.color.len() > self.driver.max_color_attachments() as usize {
            return Err(ResourceError::InvalidDescriptor(format!(
                "{} color slots exceed the driver maximum {}",
                descriptor.color.len(),
                self.driver.max_color_attachments()
            )));
        }
        Ok(self.targets.acquire(TargetResource::new(descriptor)))
    }

    fn set_target_color_attachment(
        &mut self,
        target: Handle,
        slot: usize,
        attachment: Option<ColorAttachment>,
    ) -> Result<(), ResourceError> {
        if slot >= self.driver.max_color_attachments() as usize {
            return Err(ResourceError::OutOfBounds);
        }
        let Some(resource) = self.targets.get_mut(target) else {
            return Err(ResourceError::InvalidHandle);
        };
        if resource.descriptor.set_color_attachment(slot, attachment)
            && resource.build == TargetBuildState::Clean
        {
            resource.build = TargetBuildState::Dirty;
        }
        Ok(())
    }

    fn set_target_depth_attachment(
        &mut self,
        target: Handle,
        depth: Option<Handle>,
    ) -> Result<(), ResourceError> {
        let Some(resource) = self.targets.get_mut(target) else {
            return Err(ResourceError::InvalidHandle);
        };
        if resource.descriptor.set_depth_attachment(depth)
            && resource.build == TargetBuildState::Clean
        {
            resource.build = TargetBuildState::Dirty;
        }
        Ok(())
    }

    fn resize_target(
        &mut self,
        target: Handle,
        width: u32,
        height: u32,
    ) -> Result<(), ResourceError> {
        if width == 0 || height == 0 {
            return Err(ResourceError::InvalidDescriptor(
                "render target dimensions must be nonzero".into(),
            ));
        }
        let Some(resource) = self.targets.get_mut(target) else {
            return Err(ResourceError::InvalidHandle);
        };
        if resource.descriptor.resize(width, height) && resource.build == TargetBuildState::Clean {
            resource.build = TargetBuildState::Dirty;
        }
        Ok(())
    }

    fn target_descriptor(&self, target: Handle) -> Option<&RenderTargetDescriptor> {
        self.targets.get(target).map(|t| &t.descriptor)
    }

    fn target_build_state(&self, target: Handle) -> Option<TargetBuildState> {
        self.targets.get(target).map(|t| t.build)
    }

    fn resolve_target(&mut self, target: Handle) -> Result<(), ResourceError> {
        let Some(resource) = self.targets.get(target) else {
            return Err(ResourceError::InvalidHandle);
        };
        if resource.build == TargetBuildState::Unbuilt {
            // Nothing was ever rendered into it.
            return Ok(());
        }
        target::resolve(&mut self.driver, &self.textures, resource);
        // Mip regeneration cleared the active unit's binding; the blits left
        // the framebuffer binding undefined.
        let unit = self.applied.active_texture_unit as usize;
        self.applied.pipeline.textures[unit] = None;
        self.driver.bind_framebuffer(self.applied.framebuffer);
        Ok(())
    }

    fn remove_render_target(&mut self, handle: Handle) {
        if let Some(mut resource) = self.targets.release(handle) {
            if resource.framebuffer != 0
                && self.applied.framebuffer == resource.draw_framebuffer()
            {
                self.driver.bind_framebuffer(0);
                self.applied.framebuffer = 0;
            }
            target::destroy(&mut self.driver, &mut resource);
            if self.applied.pipeline.render_target == Some(handle) {
                self.applied.pipeline.render_target = None;
            }
        }
    }

    fn read_target_pixels(&mut self, rect: Rect, format: TextureFormat) -> Vec<u8> {
        self.driver.read_pixels(rect, format)
    }

    fn set_camera(&mut self, model_view: Mat4, projection: Mat4) {
        self.model_view = model_view;
        self.projection = projection;
    }

    fn clear(
        &mut self,
        state: &PipelineState,
        color: Option<[f32; 4]>,
        depth: Option<f32>,
        stencil: Option<u32>,
    ) {
        // The pre-pass does not consume the invalidation flag; only a full
        // state application settles the whole cache.
        let force = self.applied.force_all;
        self.apply_viewport_state(state, force);
        // Overrides take precedence over the state's own clear values for
        // this call; the shared cache keeps repeated clears quiet.
        self.apply_clear_values(
            color.unwrap_or(state.clear_color),
            depth.unwrap_or(state.clear_depth),
            stencil.unwrap_or(state.clear_stencil),
            force,
        );

        let mut flags = ClearFlags::EMPTY;
        if color.is_some() {
            flags |= ClearFlags::COLOR;
        }
        if depth.is_some() {
            flags |= ClearFlags::DEPTH;
        }
        if stencil.is_some() {
            flags |= ClearFlags::STENCIL;
        }
        if !flags.is_empty() {
            self.driver.clear(flags);
        }
    }

    fn apply_state(&mut self, state: &PipelineState) {
        let force = self.applied.force_all;
        self.apply_viewport_state(state, force);
        self.apply_clear_values(state.clear_color, state.clear_depth, state.clear_stencil, force);
        self.apply_pipeline_fields(state, force);
        self.applied.force_all = false;
    }

    fn invalidate_cached_state(&mut self) {
        self.applied.force_all = true;
    }

    fn draw(&mut self, state: &PipelineState) -> Result<(), RenderError> {
        self.submit(state, false)
    }

    fn transform_feedback(&mut self, state: &PipelineState) -> Result<(), RenderError> {
        if !self.driver.supports_transform_feedback() {
            warn!("transform feedback is not supported by this driver; skipping");
            return Ok(());
        }
        self.submit(state, true)
    }

    fn is_transform_feedback_supported(&self) -> bool {
        self.driver.supports_transform_feedback()
    }

    fn max_texture_dimension(&self) -> u32 {
        self.driver.max_texture_dimension()
    }

    fn is_texture_format_supported(&self, format: TextureFormat) -> bool {
        self.driver.supports_format(format)
    }

    fn max_target_attachments(&self) -> u32 {
        self.driver.max_color_attachments()
    }

    fn max_target_msaa(&self) -> u32 {
        self.driver.max_samples()
    }

    fn drain_driver_errors(&mut self) -> Vec<DriverDiagnostic> {
        self.driver.drain_errors()
    }
}
