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

use pyxis_core::error::{ResourceError, ShaderError};
use pyxis_core::shader::UniformKind;
use pyxis_core::traits::RenderBackend;
use pyxis_infra::graphics::gl::{GlBackend, TraceCall, TraceDriver};

const VERTEX_SRC: &str = r"
    layout(location = 0) in vec3 a_position;
    in vec2 a_uv;
    uniform mat4 u_mvp;
    uniform vec4 u_tint;
";

const FRAGMENT_SRC: &str = r"
    uniform vec4 u_tint;
    uniform sampler2D u_albedo;
    uniform samplerCube u_environment;
    uniform float u_exposure;
";

fn fresh_backend() -> GlBackend<TraceDriver> {
    let _ = env_logger::builder().is_test(true).try_init();
    GlBackend::new(TraceDriver::new())
}

#[test]
fn test_reflection_builds_the_binding_table() {
    let mut backend = fresh_backend();
    let shader = backend.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();
    let bindings = backend.shader_bindings(shader).unwrap();

    assert_eq!(bindings.attributes(), ["a_position", "a_uv"]);
    assert_eq!(bindings.uniform("u_mvp").unwrap().kind, UniformKind::Mat4);
    assert_eq!(
        bindings.uniform("u_exposure").unwrap().kind,
        UniformKind::Float
    );
    assert!(bindings.uniform("u_missing").is_none());
}

#[test]
fn test_samplers_get_sequential_texture_units() {
    let mut backend = fresh_backend();
    backend.driver_mut().take_calls();
    let shader = backend.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();

    let bindings = backend.shader_bindings(shader).unwrap();
    assert_eq!(bindings.uniform("u_albedo").unwrap().texture_unit, Some(0));
    assert_eq!(
        bindings.uniform("u_environment").unwrap().texture_unit,
        Some(1)
    );
    assert_eq!(bindings.uniform("u_tint").unwrap().texture_unit, None);

    // The units were pushed to the driver at creation.
    let units: Vec<i32> = backend
        .driver()
        .calls()
        .iter()
        .filter_map(|c| match c {
            TraceCall::UploadUniformInt { value, .. } => Some(*value),
            _ => None,
        })
        .collect();
    assert_eq!(units, vec![0, 1]);
}

#[test]
fn test_uniform_uploads_are_cached() {
    let mut backend = fresh_backend();
    let shader = backend.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();
    backend.driver_mut().take_calls();

    let tint = [1.0, 0.5, 0.25, 1.0];
    assert!(backend.set_uniform(shader, "u_tint", &tint).unwrap());
    assert!(backend
        .driver_mut()
        .take_calls()
        .iter()
        .any(|c| matches!(c, TraceCall::UploadUniformFloats { len: 4, .. })));

    assert!(!backend.set_uniform(shader, "u_tint", &tint).unwrap());
    assert_eq!(backend.driver_mut().take_calls(), vec![]);

    // One different bit re-uploads.
    let nudged = [1.0, 0.5, 0.25, 0.9999];
    assert!(backend.set_uniform(shader, "u_tint", &nudged).unwrap());
}

#[test]
fn test_uniform_errors() {
    let mut backend = fresh_backend();
    let shader = backend.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();

    assert!(matches!(
        backend.set_uniform(shader, "u_nonexistent", &[0.0]),
        Err(ResourceError::Shader(ShaderError::UnknownUniform { .. }))
    ));
    assert!(matches!(
        backend.set_uniform(shader, "u_albedo", &[0.0]),
        Err(ResourceError::Shader(ShaderError::UniformMismatch { .. }))
    ));
    assert!(matches!(
        backend.set_uniform(shader, "u_tint", &[0.0, 0.0]),
        Err(ResourceError::Shader(ShaderError::UniformMismatch { .. }))
    ));
}

#[test]
fn test_compilation_failure_reports_the_stage() {
    let mut backend = fresh_backend();
    let broken = "#error deliberately broken\n";

    match backend.create_shader(VERTEX_SRC, broken) {
        Err(ResourceError::Shader(ShaderError::CompilationError { stage, .. })) => {
            assert_eq!(stage, "fragment");
        }
        other => panic!("expected a fragment compilation error, got {other:?}"),
    }
}

#[test]
fn test_program_binary_round_trip() {
    let mut backend = fresh_backend();
    let shader = backend.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();

    let blob = backend.shader_binary(shader).expect("binary export");
    let restored = backend
        .create_shader_from_binary(&blob, VERTEX_SRC, FRAGMENT_SRC)
        .unwrap();
    let bindings = backend.shader_bindings(restored).unwrap();
    assert!(bindings.uniform("u_mvp").is_some());

    // A stale format tag is rejected without panicking.
    let mut stale = blob.clone();
    stale[0] ^= 0xFF;
    assert!(matches!(
        backend.create_shader_from_binary(&stale, VERTEX_SRC, FRAGMENT_SRC),
        Err(ResourceError::Shader(ShaderError::BinaryLoadError { .. }))
    ));
}

#[test]
fn test_dead_shader_handle_is_reported() {
    let mut backend = fresh_backend();
    let shader = backend.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();
    backend.remove_shader(shader);

    assert!(backend.shader_bindings(shader).is_none());
    assert!(backend.shader_binary(shader).is_none());
    assert!(matches!(
        backend.set_uniform(shader, "u_tint", &[0.0; 4]),
        Err(ResourceError::InvalidHandle)
    ));
}
