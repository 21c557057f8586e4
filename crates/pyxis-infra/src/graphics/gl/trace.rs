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

//! A headless [`GlDriver`] that records every call it receives.
//!
//! [`TraceDriver`] hands out sequential object names and appends one
//! [`TraceCall`] per mutating driver call, so tests can assert on the exact
//! command stream the backend emits (and, just as importantly, on the calls
//! the diffing layer elided). Stage compilation fails for sources containing
//! an `#error` directive, which lets tests exercise the failure paths
//! without a real compiler.

use pyxis_core::error::DriverDiagnostic;
use pyxis_core::layout::{AttributeComponentKind, BufferUsage, IndexFormat};
use pyxis_core::state::{
    BlendFactor, ClearFlags, ColorWrites, CompareFunction, FrontFace, PrimitiveTopology, Rect,
};
use pyxis_core::target::CubeFace;
use pyxis_core::texture::TextureFormat;
use pyxis_core::UniformKind;

use super::driver::{BufferKind, GlDriver, GlName, ShaderStageKind};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum TraceCall {
    CreateBuffer(GlName),
    BindBuffer(BufferKind, GlName),
    BufferData {
        kind: BufferKind,
        len: usize,
        usage: BufferUsage,
    },
    BufferSubData {
        kind: BufferKind,
        byte_offset: u32,
        len: usize,
    },
    DeleteBuffer(GlName),

    CreateVertexArray(GlName),
    BindVertexArray(GlName),
    VertexAttributePointer {
        location: u32,
        component_count: u8,
        component_kind: AttributeComponentKind,
        normalized: bool,
        stride: u32,
        byte_offset: u32,
    },
    DeleteVertexArray(GlName),

    CreateTexture(GlName),
    BindTexture2d(GlName),
    BindTextureCube(GlName),
    SetActiveTextureUnit(u32),
    UploadTexture2d {
        level: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        with_data: bool,
    },
    UploadTextureCubeFace {
        face: CubeFace,
        level: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        with_data: bool,
    },
    GenerateMipmaps2d,
    GenerateMipmapsCube,
    DeleteTexture(GlName),

    CreateRenderbuffer(GlName),
    RenderbufferStorage {
        name: GlName,
        samples: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    },
    DeleteRenderbuffer(GlName),

    CreateFramebuffer(GlName),
    BindFramebuffer(GlName),
    AttachColorTexture {
        slot: u32,
        texture: GlName,
        level: u32,
    },
    AttachColorCubeFace {
        slot: u32,
        texture: GlName,
        face: CubeFace,
        level: u32,
    },
    AttachDepthTexture(GlName),
    AttachColorRenderbuffer {
        slot: u32,
        renderbuffer: GlName,
    },
    AttachDepthRenderbuffer(GlName),
    SetDrawBuffers(u32),
    SetReadBuffer(Option<u32>),
    BlitColor {
        src: GlName,
        src_slot: u32,
        dst: GlName,
        dst_slot: u32,
        width: u32,
        height: u32,
    },
    ReadPixels(Rect),
    DeleteFramebuffer(GlName),

    CompileStage(ShaderStageKind, GlName),
    LinkProgram(GlName),
    DeleteStage(GlName),
    DeleteProgram(GlName),
    UseProgram(GlName),
    UploadUniformFloats {
        location: i32,
        kind: UniformKind,
        array_len: u32,
        len: usize,
    },
    UploadUniformInt {
        location: i32,
        value: i32,
    },
    LoadProgramBinary {
        format_tag: u32,
        len: usize,
    },

    SetBlendEnabled(bool),
    SetBlendFactors(BlendFactor, BlendFactor),
    SetCullEnabled(bool),
    SetFrontFace(FrontFace),
    SetDepthTestEnabled(bool),
    SetDepthCompare(CompareFunction),
    SetDepthWrite(bool),
    SetColorWrites(ColorWrites),
    SetViewport(Rect),
    SetScissorEnabled(bool),
    SetScissor(Rect),
    SetClearColor([f32; 4]),
    SetClearDepth(f32),
    SetClearStencil(u32),
    Clear(ClearFlags),

    DrawArrays {
        topology: PrimitiveTopology,
        first: u32,
        count: u32,
        instances: u32,
    },
    DrawElements {
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        byte_offset: u32,
        instances: u32,
    },
    BeginTransformFeedback(PrimitiveTopology),
    EndTransformFeedback,
}

/// Capability limits reported by a [`TraceDriver`].
#[derive(Debug, Clone)]
pub struct TraceCaps {
    /// Largest accepted texture dimension.
    pub max_texture_dimension: u32,
    /// Maximum color attachments per framebuffer.
    pub max_color_attachments: u32,
    /// Maximum MSAA sample count.
    pub max_samples: u32,
    /// Whether transform feedback is reported as available.
    pub transform_feedback: bool,
    /// Whether program binary export is reported as available.
    pub program_binaries: bool,
    /// Formats reported as unsupported.
    pub unsupported_formats: Vec<TextureFormat>,
}

impl Default for TraceCaps {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16_384,
            max_color_attachments: 8,
            max_samples: 8,
            transform_feedback: true,
            program_binaries: true,
            unsupported_formats: Vec::new(),
        }
    }
}

/// A recording, no-op driver. See the module docs.
#[derive(Debug, Default)]
pub struct TraceDriver {
    calls: Vec<TraceCall>,
    next_name: GlName,
    next_location: i32,
    pending_errors: Vec<DriverDiagnostic>,
    /// Capability limits to report. Adjustable before handing the driver to
    /// a backend.
    pub caps: TraceCaps,
}

impl TraceDriver {
    /// Format tag accepted by [`GlDriver::load_program_binary`].
    pub const BINARY_FORMAT_TAG: u32 = 0x5059_4201;

    /// Creates a driver with default capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a driver with explicit capabilities.
    pub fn with_caps(caps: TraceCaps) -> Self {
        Self {
            caps,
            ..Self::default()
        }
    }

    /// The calls recorded since the last [`take_calls`](Self::take_calls).
    pub fn calls(&self) -> &[TraceCall] {
        &self.calls
    }

    /// Takes and clears the recorded calls.
    pub fn take_calls(&mut self) -> Vec<TraceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Queues an error for the next [`GlDriver::drain_errors`].
    pub fn push_error(&mut self, code: u32, message: impl Into<String>) {
        self.pending_errors.push(DriverDiagnostic {
            code,
            message: message.into(),
        });
    }

    fn record(&mut self, call: TraceCall) {
        self.calls.push(call);
    }

    fn allocate_name(&mut self) -> GlName {
        self.next_name += 1;
        self.next_name
    }
}

impl GlDriver for TraceDriver {
    fn create_buffer(&mut self) -> GlName {
        let name = self.allocate_name();
        self.record(TraceCall::CreateBuffer(name));
        name
    }

    fn bind_buffer(&mut self, kind: BufferKind, name: GlName) {
        self.record(TraceCall::BindBuffer(kind, name));
    }

    fn buffer_data(&mut self, kind: BufferKind, data: &[u8], usage: BufferUsage) {
        self.record(TraceCall::BufferData {
            kind,
            len: data.len(),
            usage,
        });
    }

    fn buffer_sub_data(&mut self, kind: BufferKind, byte_offset: u32, data: &[u8]) {
        self.record(TraceCall::BufferSubData {
            kind,
            byte_offset,
            len: data.len(),
        });
    }

    fn delete_buffer(&mut self, name: GlName) {
        self.record(TraceCall::DeleteBuffer(name));
    }

    fn create_vertex_array(&mut self) -> GlName {
        let name = self.allocate_name();
        self.record(TraceCall::CreateVertexArray(name));
        name
    }

    fn bind_vertex_array(&mut self, name: GlName) {
        self.record(TraceCall::BindVertexArray(name));
    }

    fn vertex_attribute_pointer(
        &mut self,
        location: u32,
        component_count: u8,
        component_kind: AttributeComponentKind,
        normalized: bool,
        stride: u32,
        byte_offset: u32,
    ) {
        self.record(TraceCall::VertexAttributePointer {
            location,
            component_count,
            component_kind,
            normalized,
            stride,
            byte_offset,
        });
    }

    fn delete_vertex_array(&mut self, name: GlName) {
        self.record(TraceCall::DeleteVertexArray(name));
    }

    fn create_texture(&mut self) -> GlName {
        let name = self.allocate_name();
        self.record(TraceCall::CreateTexture(name));
        name
    }

    fn bind_texture_2d(&mut self, name: GlName) {
        self.record(TraceCall::BindTexture2d(name));
    }

    fn bind_texture_cube(&mut self, name: GlName) {
        self.record(TraceCall::BindTextureCube(name));
    }

    fn set_active_texture_unit(&mut self, unit: u32) {
        self.record(TraceCall::SetActiveTextureUnit(unit));
    }

    fn upload_texture_2d(
        &mut self,
        level: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: Option<&[u8]>,
    ) {
        self.record(TraceCall::UploadTexture2d {
            level,
            width,
            height,
            format,
            with_data: data.is_some(),
        });
    }

    fn upload_texture_cube_face(
        &mut self,
        face: CubeFace,
        level: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: Option<&[u8]>,
    ) {
        self.record(TraceCall::UploadTextureCubeFace {
            face,
            level,
            width,
            height,
            format,
            with_data: data.is_some(),
        });
    }

    fn generate_mipmaps_2d(&mut self) {
        self.record(TraceCall::GenerateMipmaps2d);
    }

    fn generate_mipmaps_cube(&mut self) {
        self.record(TraceCall::GenerateMipmapsCube);
    }

    fn delete_texture(&mut self, name: GlName) {
        self.record(TraceCall::DeleteTexture(name));
    }

    fn create_renderbuffer(&mut self) -> GlName {
        let name = self.allocate_name();
        self.record(TraceCall::CreateRenderbuffer(name));
        name
    }

    fn renderbuffer_storage(
        &mut self,
        name: GlName,
        samples: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) {
        self.record(TraceCall::RenderbufferStorage {
            name,
            samples,
            format,
            width,
            height,
        });
    }

    fn delete_renderbuffer(&mut self, name: GlName) {
        self.record(TraceCall::DeleteRenderbuffer(name));
    }

    fn create_framebuffer(&mut self) -> GlName {
        let name = self.allocate_name();
        self.record(TraceCall::CreateFramebuffer(name));
        name
    }

    fn bind_framebuffer(&mut self, name: GlName) {
        self.record(TraceCall::BindFramebuffer(name));
    }

    fn attach_color_texture(&mut self, slot: u32, texture: GlName, level: u32) {
        self.record(TraceCall::AttachColorTexture {
            slot,
            texture,
            level,
        });
    }

    fn attach_color_cube_face(&mut self, slot: u32, texture: GlName, face: CubeFace, level: u32) {
        self.record(TraceCall::AttachColorCubeFace {
            slot,
            texture,
            face,
            level,
        });
    }

    fn attach_depth_texture(&mut self, texture: GlName) {
        self.record(TraceCall::AttachDepthTexture(texture));
    }

    fn attach_color_renderbuffer(&mut self, slot: u32, renderbuffer: GlName) {
        self.record(TraceCall::AttachColorRenderbuffer { slot, renderbuffer });
    }

    fn attach_depth_renderbuffer(&mut self, renderbuffer: GlName) {
        self.record(TraceCall::AttachDepthRenderbuffer(renderbuffer));
    }

    fn set_draw_buffers(&mut self, count: u32) {
        self.record(TraceCall::SetDrawBuffers(count));
    }

    fn set_read_buffer(&mut self, slot: Option<u32>) {
        self.record(TraceCall::SetReadBuffer(slot));
    }

    fn framebuffer_complete(&mut self) -> bool {
        true
    }

    fn blit_color(
        &mut self,
        src: GlName,
        src_slot: u32,
        dst: GlName,
        dst_slot: u32,
        width: u32,
        height: u32,
    ) {
        self.record(TraceCall::BlitColor {
            src,
            src_slot,
            dst,
            dst_slot,
            width,
            height,
        });
    }

    fn read_pixels(&mut self, rect: Rect, format: TextureFormat) -> Vec<u8> {
        self.record(TraceCall::ReadPixels(rect));
        let texels = (rect.width as usize) * (rect.height as usize);
        vec![0; texels * format.bytes_per_texel() as usize]
    }

    fn delete_framebuffer(&mut self, name: GlName) {
        self.record(TraceCall::DeleteFramebuffer(name));
    }

    fn compile_stage(&mut self, kind: ShaderStageKind, source: &str) -> Result<GlName, String> {
        if let Some(line) = source.lines().find(|l| l.trim_start().starts_with("#error")) {
            return Err(format!("stage rejected: {}", line.trim()));
        }
        let name = self.allocate_name();
        self.record(TraceCall::CompileStage(kind, name));
        Ok(name)
    }

    fn link_program(&mut self, _vertex: GlName, _fragment: GlName) -> Result<GlName, String> {
        let name = self.allocate_name();
        self.record(TraceCall::LinkProgram(name));
        Ok(name)
    }

    fn delete_stage(&mut self, name: GlName) {
        self.record(TraceCall::DeleteStage(name));
    }

    fn delete_program(&mut self, name: GlName) {
        self.record(TraceCall::DeleteProgram(name));
    }

    fn use_program(&mut self, name: GlName) {
        self.record(TraceCall::UseProgram(name));
    }

    fn uniform_location(&mut self, _program: GlName, _name: &str) -> i32 {
        self.next_location += 1;
        self.next_location
    }

    fn upload_uniform_floats(
        &mut self,
        location: i32,
        kind: UniformKind,
        array_len: u32,
        data: &[f32],
    ) {
        self.record(TraceCall::UploadUniformFloats {
            location,
            kind,
            array_len,
            len: data.len(),
        });
    }

    fn upload_uniform_int(&mut self, location: i32, value: i32) {
        self.record(TraceCall::UploadUniformInt { location, value });
    }

    fn program_binary(&mut self, program: GlName) -> Option<(u32, Vec<u8>)> {
        if !self.caps.program_binaries {
            return None;
        }
        Some((Self::BINARY_FORMAT_TAG, program.to_le_bytes().to_vec()))
    }

    fn load_program_binary(&mut self, format_tag: u32, bytes: &[u8]) -> Result<GlName, String> {
        if format_tag != Self::BINARY_FORMAT_TAG {
            return Err(format!("unrecognized program binary format {format_tag:#x}"));
        }
        self.record(TraceCall::LoadProgramBinary {
            format_tag,
            len: bytes.len(),
        });
        let name = self.allocate_name();
        Ok(name)
    }

    fn set_blend_enabled(&mut self, enabled: bool) {
        self.record(TraceCall::SetBlendEnabled(enabled));
    }

    fn set_blend_factors(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.record(TraceCall::SetBlendFactors(src, dst));
    }

    fn set_cull_enabled(&mut self, enabled: bool) {
        self.record(TraceCall::SetCullEnabled(enabled));
    }

    fn set_front_face(&mut self, order: FrontFace) {
        self.record(TraceCall::SetFrontFace(order));
    }

    fn set_depth_test_enabled(&mut self, enabled: bool) {
        self.record(TraceCall::SetDepthTestEnabled(enabled));
    }

    fn set_depth_compare(&mut self, compare: CompareFunction) {
        self.record(TraceCall::SetDepthCompare(compare));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.record(TraceCall::SetDepthWrite(enabled));
    }

    fn set_color_writes(&mut self, mask: ColorWrites) {
        self.record(TraceCall::SetColorWrites(mask));
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.record(TraceCall::SetViewport(rect));
    }

    fn set_scissor_enabled(&mut self, enabled: bool) {
        self.record(TraceCall::SetScissorEnabled(enabled));
    }

    fn set_scissor(&mut self, rect: Rect) {
        self.record(TraceCall::SetScissor(rect));
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.record(TraceCall::SetClearColor(color));
    }

    fn set_clear_depth(&mut self, depth: f32) {
        self.record(TraceCall::SetClearDepth(depth));
    }

    fn set_clear_stencil(&mut self, stencil: u32) {
        self.record(TraceCall::SetClearStencil(stencil));
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.record(TraceCall::Clear(flags));
    }

    fn draw_arrays(&mut self, topology: PrimitiveTopology, first: u32, count: u32, instances: u32) {
        self.record(TraceCall::DrawArrays {
            topology,
            first,
            count,
            instances,
        });
    }

    fn draw_elements(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        byte_offset: u32,
        instances: u32,
    ) {
        self.record(TraceCall::DrawElements {
            topology,
            count,
            format,
            byte_offset,
            instances,
        });
    }

    fn begin_transform_feedback(&mut self, topology: PrimitiveTopology) {
        self.record(TraceCall::BeginTransformFeedback(topology));
    }

    fn end_transform_feedback(&mut self) {
        self.record(TraceCall::EndTransformFeedback);
    }

    fn max_texture_dimension(&self) -> u32 {
        self.caps.max_texture_dimension
    }

    fn max_color_attachments(&self) -> u32 {
        self.caps.max_color_attachments
    }

    fn max_samples(&self) -> u32 {
        self.caps.max_samples
    }

    fn supports_format(&self, format: TextureFormat) -> bool {
        !self.caps.unsupported_formats.contains(&format)
    }

    fn supports_transform_feedback(&self) -> bool {
        self.caps.transform_feedback
    }

    fn supports_program_binaries(&self) -> bool {
        self.caps.program_binaries
    }

    fn drain_errors(&mut self) -> Vec<DriverDiagnostic> {
        std::mem::take(&mut self.pending_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sequential_and_nonzero() {
        let mut driver = TraceDriver::new();
        let a = driver.create_buffer();
        let b = driver.create_texture();
        assert!(a > 0);
        assert_eq!(b, a + 1);
    }

    #[test]
    fn compile_rejects_error_directive() {
        let mut driver = TraceDriver::new();
        let result = driver.compile_stage(ShaderStageKind::Vertex, "#error broken\n");
        assert!(result.is_err());
    }

    #[test]
    fn drain_errors_empties_the_queue() {
        let mut driver = TraceDriver::new();
        driver.push_error(0x0502, "invalid operation");
        assert_eq!(driver.drain_errors().len(), 1);
        assert!(driver.drain_errors().is_empty());
    }
}
