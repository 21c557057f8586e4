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

use glam::Mat4;
use pyxis_core::layout::{
    AttributeComponentKind, BufferUsage, IndexFormat, VertexAttribute, VertexAttributeKind,
    VertexLayout,
};
use pyxis_core::pool::Handle;
use pyxis_core::state::PipelineState;
use pyxis_core::traits::RenderBackend;
use pyxis_infra::graphics::gl::{GlBackend, TraceCall, TraceCaps, TraceDriver};

const VERTEX_SRC: &str = r"
    in vec3 a_position;
    uniform mat4 u_mvp;
";

const FRAGMENT_SRC: &str = r"
    uniform vec4 u_tint;
";

fn position_layout() -> VertexLayout {
    let mut layout = VertexLayout::new(12);
    layout.set_attribute(VertexAttribute {
        kind: VertexAttributeKind::Position,
        offset: 0,
        component_count: 3,
        component_kind: AttributeComponentKind::F32,
    });
    layout
}

struct Scene {
    backend: GlBackend<TraceDriver>,
    vertex_buffer: Handle,
    shader: Handle,
}

fn triangle_scene() -> Scene {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut backend = GlBackend::new(TraceDriver::new());
    let vertices: [f32; 9] = [0.0, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0];
    let vertex_buffer = backend
        .create_vertex_buffer(
            bytemuck::cast_slice(&vertices),
            &position_layout(),
            3,
            BufferUsage::Static,
        )
        .unwrap();
    let shader = backend.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();
    Scene {
        backend,
        vertex_buffer,
        shader,
    }
}

fn draw_state(scene: &Scene) -> PipelineState {
    PipelineState {
        vertex_buffer: Some(scene.vertex_buffer),
        shader: Some(scene.shader),
        count: 3,
        ..Default::default()
    }
}

#[test]
fn test_draw_emits_arrays_for_unindexed_geometry() {
    let mut scene = triangle_scene();
    let state = draw_state(&scene);
    scene.backend.driver_mut().take_calls();

    scene.backend.draw(&state).unwrap();
    let calls = scene.backend.driver_mut().take_calls();
    assert!(calls.contains(&TraceCall::DrawArrays {
        topology: Default::default(),
        first: 0,
        count: 3,
        instances: 1,
    }));
}

#[test]
fn test_out_of_range_draws_are_silently_skipped() {
    let mut scene = triangle_scene();
    let mut state = draw_state(&scene);
    scene.backend.draw(&state).unwrap();
    scene.backend.driver_mut().take_calls();

    // Three vertices exist; a range of 1..4 exceeds them.
    state.offset = 1;
    scene.backend.draw(&state).unwrap();
    let calls = scene.backend.driver_mut().take_calls();
    assert!(
        !calls.iter().any(|c| matches!(c, TraceCall::DrawArrays { .. })),
        "no draw may reach the driver: {calls:?}"
    );
}

#[test]
fn test_vertex_array_is_built_once_and_rebuilt_on_layout_change() {
    let mut scene = triangle_scene();
    let state = draw_state(&scene);
    scene.backend.driver_mut().take_calls();

    scene.backend.draw(&state).unwrap();
    let calls = scene.backend.driver_mut().take_calls();
    assert!(calls.iter().any(|c| matches!(c, TraceCall::CreateVertexArray(_))));
    assert!(calls.iter().any(|c| matches!(
        c,
        TraceCall::VertexAttributePointer {
            location: 0,
            component_count: 3,
            ..
        }
    )));

    scene.backend.draw(&state).unwrap();
    let calls = scene.backend.driver_mut().take_calls();
    assert!(
        !calls.iter().any(|c| matches!(c, TraceCall::CreateVertexArray(_))),
        "the compiled binding must be reused: {calls:?}"
    );

    // A layout change invalidates the compiled binding.
    let mut layout = position_layout();
    layout.set_stride(16);
    scene
        .backend
        .set_vertex_layout(scene.vertex_buffer, &layout)
        .unwrap();
    scene.backend.draw(&state).unwrap();
    let calls = scene.backend.driver_mut().take_calls();
    assert!(calls.iter().any(|c| matches!(c, TraceCall::CreateVertexArray(_))));
}

#[test]
fn test_indexed_draw_uses_the_index_format() {
    let mut scene = triangle_scene();
    let indices: [u16; 3] = [0, 1, 2];
    let index_buffer = scene
        .backend
        .create_index_buffer(
            bytemuck::cast_slice(&indices),
            IndexFormat::U16,
            3,
            BufferUsage::Static,
        )
        .unwrap();
    let mut state = draw_state(&scene);
    state.index_buffer = Some(index_buffer);
    scene.backend.driver_mut().take_calls();

    scene.backend.draw(&state).unwrap();
    let calls = scene.backend.driver_mut().take_calls();
    assert!(calls.contains(&TraceCall::DrawElements {
        topology: Default::default(),
        count: 3,
        format: IndexFormat::U16,
        byte_offset: 0,
        instances: 1,
    }));

    // Bounds are checked against the index count, not the vertex count.
    state.count = 4;
    scene.backend.draw(&state).unwrap();
    let calls = scene.backend.driver_mut().take_calls();
    assert!(!calls.iter().any(|c| matches!(c, TraceCall::DrawElements { .. })));
}

#[test]
fn test_predefined_matrices_upload_through_the_cache() {
    let mut scene = triangle_scene();
    let state = draw_state(&scene);
    scene
        .backend
        .set_camera(Mat4::IDENTITY, Mat4::orthographic_rh_gl(0.0, 1.0, 0.0, 1.0, -1.0, 1.0));
    scene.backend.driver_mut().take_calls();

    scene.backend.draw(&state).unwrap();
    let uploads = scene
        .backend
        .driver_mut()
        .take_calls()
        .iter()
        .filter(|c| matches!(c, TraceCall::UploadUniformFloats { len: 16, .. }))
        .count();
    assert_eq!(uploads, 1, "the shader declares u_mvp only");

    // Unchanged camera: the cached matrix suppresses the re-upload.
    scene.backend.draw(&state).unwrap();
    let uploads = scene
        .backend
        .driver_mut()
        .take_calls()
        .iter()
        .filter(|c| matches!(c, TraceCall::UploadUniformFloats { .. }))
        .count();
    assert_eq!(uploads, 0);

    // A camera change flows through on the next draw.
    scene.backend.set_camera(Mat4::from_scale(glam::Vec3::splat(2.0)), Mat4::IDENTITY);
    scene.backend.draw(&state).unwrap();
    assert!(scene
        .backend
        .driver_mut()
        .take_calls()
        .iter()
        .any(|c| matches!(c, TraceCall::UploadUniformFloats { len: 16, .. })));
}

#[test]
fn test_program_binding_is_elided_between_draws() {
    let mut scene = triangle_scene();
    let state = draw_state(&scene);
    scene.backend.draw(&state).unwrap();
    scene.backend.driver_mut().take_calls();

    scene.backend.draw(&state).unwrap();
    let calls = scene.backend.driver_mut().take_calls();
    assert!(
        !calls.iter().any(|c| matches!(c, TraceCall::UseProgram(_))),
        "program rebind must be elided: {calls:?}"
    );

    scene.backend.invalidate_cached_state();
    scene.backend.draw(&state).unwrap();
    let calls = scene.backend.driver_mut().take_calls();
    assert!(calls.iter().any(|c| matches!(c, TraceCall::UseProgram(_))));
    assert!(calls.iter().any(|c| matches!(c, TraceCall::BindVertexArray(_))));
}

#[test]
fn test_transform_feedback_wraps_the_draw() {
    let mut scene = triangle_scene();
    let state = draw_state(&scene);
    scene.backend.driver_mut().take_calls();

    assert!(scene.backend.is_transform_feedback_supported());
    scene.backend.transform_feedback(&state).unwrap();
    let calls = scene.backend.driver_mut().take_calls();
    let begin = calls
        .iter()
        .position(|c| matches!(c, TraceCall::BeginTransformFeedback(_)))
        .expect("feedback begins");
    let draw = calls
        .iter()
        .position(|c| matches!(c, TraceCall::DrawArrays { .. }))
        .expect("draw is issued");
    let end = calls
        .iter()
        .position(|c| matches!(c, TraceCall::EndTransformFeedback))
        .expect("feedback ends");
    assert!(begin < draw && draw < end);
}

#[test]
fn test_transform_feedback_is_skipped_without_driver_support() {
    let caps = TraceCaps {
        transform_feedback: false,
        ..Default::default()
    };
    let mut backend = GlBackend::new(TraceDriver::with_caps(caps));
    assert!(!backend.is_transform_feedback_supported());

    let state = PipelineState::default();
    backend.driver_mut().take_calls();
    backend.transform_feedback(&state).unwrap();
    assert!(
        !backend
            .driver_mut()
            .take_calls()
            .iter()
            .any(|c| matches!(c, TraceCall::BeginTransformFeedback(_))),
        "unsupported capability must be skipped"
    );
}

#[test]
fn test_draw_without_bindings_is_a_quiet_no_op() {
    let mut backend = GlBackend::new(TraceDriver::new());
    let state = PipelineState::default();
    backend.apply_state(&state);
    backend.driver_mut().take_calls();

    backend.draw(&state).unwrap();
    let calls = backend.driver_mut().take_calls();
    assert!(!calls.iter().any(|c| matches!(c, TraceCall::DrawArrays { .. })));
}
