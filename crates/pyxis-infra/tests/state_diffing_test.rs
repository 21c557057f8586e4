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

use pyxis_core::state::{PipelineState, Rect};
use pyxis_core::target::CubeFace;
use pyxis_core::texture::{MipPolicy, TextureDescriptor, TextureFormat};
use pyxis_core::traits::RenderBackend;
use pyxis_infra::graphics::gl::{GlBackend, TraceCall, TraceDriver};

fn fresh_backend() -> GlBackend<TraceDriver> {
    let _ = env_logger::builder().is_test(true).try_init();
    GlBackend::new(TraceDriver::new())
}

#[test]
fn test_identical_state_application_emits_nothing() {
    let mut backend = fresh_backend();
    let state = PipelineState {
        viewport: Rect::new(0, 0, 640, 480),
        depth_test_enabled: true,
        ..Default::default()
    };

    backend.apply_state(&state);
    let first = backend.driver_mut().take_calls();
    assert!(
        first.contains(&TraceCall::SetDepthTestEnabled(true)),
        "first application must reach the driver"
    );

    backend.apply_state(&state);
    assert_eq!(
        backend.driver_mut().take_calls(),
        vec![],
        "re-applying the identical state must be elided entirely"
    );
}

#[test]
fn test_only_changed_fields_are_emitted() {
    let mut backend = fresh_backend();
    let state = PipelineState::default();
    backend.apply_state(&state);
    backend.driver_mut().take_calls();

    let mut next = state.clone();
    next.cull_enabled = true;
    backend.apply_state(&next);
    assert_eq!(
        backend.driver_mut().take_calls(),
        vec![TraceCall::SetCullEnabled(true)]
    );
}

#[test]
fn test_invalidation_forces_full_reemission() {
    let mut backend = fresh_backend();
    let state = PipelineState {
        depth_test_enabled: true,
        ..Default::default()
    };
    backend.apply_state(&state);
    backend.driver_mut().take_calls();

    backend.invalidate_cached_state();
    backend.apply_state(&state);
    let calls = backend.driver_mut().take_calls();
    assert!(calls.contains(&TraceCall::SetDepthTestEnabled(true)));
    assert!(calls.contains(&TraceCall::BindFramebuffer(0)));
    assert!(calls.contains(&TraceCall::SetViewport(Rect::default())));
}

#[test]
fn test_texture_unit_activation_is_elided() {
    let mut backend = fresh_backend();
    let descriptor = TextureDescriptor {
        width: 4,
        height: 4,
        format: TextureFormat::Rgba8,
        mips: MipPolicy::None,
    };
    let texture = backend.create_texture(&descriptor, None).unwrap();

    let mut state = PipelineState::default();
    state.textures[2] = Some(texture);
    backend.apply_state(&state);
    // Creation left the texture cached on unit 0; the first application
    // unbinds it there and binds unit 2 — no other unit may be touched, so
    // unit 2 stays active afterwards.
    let activations: Vec<_> = backend
        .driver_mut()
        .take_calls()
        .into_iter()
        .filter(|c| matches!(c, TraceCall::SetActiveTextureUnit(_)))
        .collect();
    assert_eq!(
        activations,
        vec![
            TraceCall::SetActiveTextureUnit(0),
            TraceCall::SetActiveTextureUnit(2),
        ]
    );

    // Rebinding the same texture on the same unit: no activation, no bind.
    backend.apply_state(&state);
    assert_eq!(backend.driver_mut().take_calls(), vec![]);

    // Unbinding emits exactly one activation (unit 2 is already active) and
    // one unbind.
    state.textures[2] = None;
    backend.apply_state(&state);
    assert_eq!(
        backend.driver_mut().take_calls(),
        vec![TraceCall::BindTexture2d(0)]
    );
}

#[test]
fn test_clear_sets_only_requested_aspects() {
    let mut backend = fresh_backend();
    let state = PipelineState::default();
    backend.apply_state(&state);
    backend.driver_mut().take_calls();

    backend.clear(&state, Some([0.2, 0.2, 0.2, 1.0]), Some(1.0), None);
    let calls = backend.driver_mut().take_calls();
    assert!(calls.contains(&TraceCall::SetClearColor([0.2, 0.2, 0.2, 1.0])));
    let Some(TraceCall::Clear(flags)) = calls.last() else {
        panic!("clear must end with a driver clear, got {calls:?}");
    };
    assert!(flags.contains(pyxis_core::state::ClearFlags::COLOR));
    assert!(flags.contains(pyxis_core::state::ClearFlags::DEPTH));
    assert!(!flags.contains(pyxis_core::state::ClearFlags::STENCIL));

    // Same clear values again: only the clear itself is re-emitted.
    backend.clear(&state, Some([0.2, 0.2, 0.2, 1.0]), Some(1.0), None);
    let calls = backend.driver_mut().take_calls();
    assert_eq!(calls.len(), 1, "clear values were cached: {calls:?}");

    // The override landed in the cache, so restoring the state's own clear
    // color is exactly one call.
    backend.apply_state(&state);
    assert_eq!(
        backend.driver_mut().take_calls(),
        vec![TraceCall::SetClearColor([0.0, 0.0, 0.0, 1.0])]
    );
}

#[test]
fn test_cache_survives_failed_resource_creation() {
    let mut backend = fresh_backend();
    let state = PipelineState::default();
    backend.apply_state(&state);
    backend.driver_mut().take_calls();

    let descriptor = TextureDescriptor {
        width: 0,
        height: 0,
        format: TextureFormat::Rgba8,
        mips: MipPolicy::None,
    };
    assert!(backend.create_texture(&descriptor, None).is_err());

    // The failed creation touched nothing, so the next application still
    // diffs against valid state.
    backend.apply_state(&state);
    assert_eq!(backend.driver_mut().take_calls(), vec![]);
}

#[test]
fn test_cubemap_update_touches_only_the_named_face() {
    let mut backend = fresh_backend();
    let descriptor = TextureDescriptor {
        width: 4,
        height: 4,
        format: TextureFormat::Rgba8,
        mips: MipPolicy::None,
    };
    let cube = backend.create_cubemap(&descriptor, &[None; 6]).unwrap();
    backend.driver_mut().take_calls();

    let face_texels = [0u8; 64];
    backend
        .update_cubemap(cube, CubeFace::NegativeY, &face_texels)
        .unwrap();
    let calls = backend.driver_mut().take_calls();
    let uploads: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            TraceCall::UploadTextureCubeFace { face, with_data, .. } => Some((*face, *with_data)),
            _ => None,
        })
        .collect();
    assert_eq!(uploads, vec![(CubeFace::NegativeY, true)]);

    // The flat-texture update path refuses cube handles.
    assert!(backend.update_texture(cube, &face_texels).is_err());
}

#[test]
fn test_remove_cubemap_leaves_flat_textures_alone() {
    let mut backend = fresh_backend();
    let descriptor = TextureDescriptor {
        width: 4,
        height: 4,
        format: TextureFormat::Rgba8,
        mips: MipPolicy::None,
    };
    let flat = backend.create_texture(&descriptor, None).unwrap();
    let cube = backend.create_cubemap(&descriptor, &[None; 6]).unwrap();

    backend.remove_cubemap(flat);
    assert!(backend.texture_descriptor(flat).is_some());

    backend.driver_mut().take_calls();
    backend.remove_cubemap(cube);
    assert!(backend.texture_descriptor(cube).is_none());
    let calls = backend.driver_mut().take_calls();
    assert!(calls.iter().any(|c| matches!(c, TraceCall::DeleteTexture(_))));
}
