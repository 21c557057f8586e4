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

use pyxis_core::pool::Handle;
use pyxis_core::state::{PipelineState, Rect};
use pyxis_core::target::{ColorAttachment, RenderTargetDescriptor, TargetBuildState};
use pyxis_core::texture::{MipPolicy, TextureDescriptor, TextureFormat};
use pyxis_core::traits::RenderBackend;
use pyxis_infra::graphics::gl::{GlBackend, TraceCall, TraceCaps, TraceDriver};

fn fresh_backend() -> GlBackend<TraceDriver> {
    let _ = env_logger::builder().is_test(true).try_init();
    GlBackend::new(TraceDriver::new())
}

fn color_texture(backend: &mut GlBackend<TraceDriver>, size: u32) -> Handle {
    let descriptor = TextureDescriptor {
        width: size,
        height: size,
        format: TextureFormat::Rgba8,
        mips: MipPolicy::None,
    };
    backend.create_texture(&descriptor, None).unwrap()
}

fn offscreen_target(
    backend: &mut GlBackend<TraceDriver>,
    size: u32,
    samples: u32,
) -> (Handle, Handle) {
    let texture = color_texture(backend, size);
    let mut descriptor = RenderTargetDescriptor::new(size, size);
    descriptor.samples = samples;
    descriptor.set_color_attachment(
        0,
        Some(ColorAttachment {
            texture,
            face: None,
            generate_mips: false,
        }),
    );
    let target = backend.create_render_target(descriptor).unwrap();
    (target, texture)
}

#[test]
fn test_target_is_built_lazily_on_first_bind() {
    let mut backend = fresh_backend();
    let (target, _) = offscreen_target(&mut backend, 128, 1);
    assert_eq!(
        backend.target_build_state(target),
        Some(TargetBuildState::Unbuilt)
    );
    backend.driver_mut().take_calls();

    let state = PipelineState {
        render_target: Some(target),
        ..Default::default()
    };
    backend.clear(&state, Some([0.0; 4]), None, None);

    assert_eq!(
        backend.target_build_state(target),
        Some(TargetBuildState::Clean)
    );
    let calls = backend.driver_mut().take_calls();
    assert!(calls.iter().any(|c| matches!(c, TraceCall::CreateFramebuffer(_))));
    assert!(calls
        .iter()
        .any(|c| matches!(c, TraceCall::AttachColorTexture { slot: 0, .. })));
    assert!(calls.contains(&TraceCall::SetDrawBuffers(1)));
}

#[test]
fn test_descriptor_changes_drive_the_dirty_cycle() {
    let mut backend = fresh_backend();
    let (target, texture) = offscreen_target(&mut backend, 128, 1);
    let state = PipelineState {
        render_target: Some(target),
        ..Default::default()
    };
    backend.clear(&state, Some([0.0; 4]), None, None);
    assert_eq!(
        backend.target_build_state(target),
        Some(TargetBuildState::Clean)
    );

    // A real change dirties; re-binding rebuilds exactly once.
    backend.resize_target(target, 256, 256).unwrap();
    assert_eq!(
        backend.target_build_state(target),
        Some(TargetBuildState::Dirty)
    );
    backend.driver_mut().take_calls();
    backend.clear(&state, Some([0.0; 4]), None, None);
    assert_eq!(
        backend.target_build_state(target),
        Some(TargetBuildState::Clean)
    );
    let calls = backend.driver_mut().take_calls();
    assert!(calls.iter().any(|c| matches!(c, TraceCall::DeleteFramebuffer(_))));
    assert!(calls.iter().any(|c| matches!(c, TraceCall::CreateFramebuffer(_))));

    // Setting the same attachment again is not a change.
    backend
        .set_target_color_attachment(
            target,
            0,
            Some(ColorAttachment {
                texture,
                face: None,
                generate_mips: false,
            }),
        )
        .unwrap();
    assert_eq!(
        backend.target_build_state(target),
        Some(TargetBuildState::Clean)
    );

    // Resizing to the current size is not a change either.
    backend.resize_target(target, 256, 256).unwrap();
    assert_eq!(
        backend.target_build_state(target),
        Some(TargetBuildState::Clean)
    );
}

#[test]
fn test_multisampled_target_builds_renderbuffers_and_resolves() {
    let mut backend = fresh_backend();
    let (target, _) = offscreen_target(&mut backend, 256, 4);
    let state = PipelineState {
        render_target: Some(target),
        ..Default::default()
    };
    backend.driver_mut().take_calls();
    backend.clear(&state, Some([0.0; 4]), None, None);

    let calls = backend.driver_mut().take_calls();
    let framebuffers = calls
        .iter()
        .filter(|c| matches!(c, TraceCall::CreateFramebuffer(_)))
        .count();
    assert_eq!(framebuffers, 2, "resolve and multisample framebuffers");
    assert!(calls.iter().any(|c| matches!(
        c,
        TraceCall::RenderbufferStorage {
            samples: 4,
            width: 256,
            height: 256,
            ..
        }
    )));

    backend.resolve_target(target).unwrap();
    let calls = backend.driver_mut().take_calls();
    assert!(calls.iter().any(|c| matches!(
        c,
        TraceCall::BlitColor {
            src_slot: 0,
            dst_slot: 0,
            width: 256,
            height: 256,
            ..
        }
    )));
    // The blit left the binding undefined; the backend restores it.
    assert!(matches!(calls.last(), Some(TraceCall::BindFramebuffer(_))));

    // Resolved pixels can be read back synchronously.
    let rect = Rect::new(0, 0, 256, 256);
    let pixels = backend.read_target_pixels(rect, TextureFormat::Rgba8);
    assert_eq!(pixels.len(), 256 * 256 * 4);
    assert!(backend
        .driver_mut()
        .take_calls()
        .contains(&TraceCall::ReadPixels(rect)));
}

#[test]
fn test_sample_count_is_clamped_to_driver_maximum() {
    let caps = TraceCaps {
        max_samples: 2,
        ..Default::default()
    };
    let mut backend = GlBackend::new(TraceDriver::with_caps(caps));
    let (target, _) = offscreen_target(&mut backend, 64, 8);
    let state = PipelineState {
        render_target: Some(target),
        ..Default::default()
    };
    backend.driver_mut().take_calls();
    backend.clear(&state, None, Some(1.5), None);

    let calls = backend.driver_mut().take_calls();
    assert!(calls
        .iter()
        .any(|c| matches!(c, TraceCall::RenderbufferStorage { samples: 2, .. })));
}

#[test]
fn test_depth_only_target_disables_color_output() {
    let mut backend = fresh_backend();
    let depth_descriptor = TextureDescriptor {
        width: 512,
        height: 512,
        format: TextureFormat::Depth32Float,
        mips: MipPolicy::None,
    };
    let depth = backend.create_texture(&depth_descriptor, None).unwrap();
    let mut descriptor = RenderTargetDescriptor::new(512, 512);
    descriptor.set_depth_attachment(Some(depth));
    let target = backend.create_render_target(descriptor).unwrap();

    let state = PipelineState {
        render_target: Some(target),
        ..Default::default()
    };
    backend.driver_mut().take_calls();
    backend.clear(&state, None, Some(1.0), None);

    let calls = backend.driver_mut().take_calls();
    assert!(calls.contains(&TraceCall::SetDrawBuffers(0)));
    assert!(calls.contains(&TraceCall::SetReadBuffer(None)));
    assert!(calls.iter().any(|c| matches!(c, TraceCall::AttachDepthTexture(_))));
}

#[test]
fn test_removing_a_bound_target_falls_back_to_default() {
    let mut backend = fresh_backend();
    let (target, _) = offscreen_target(&mut backend, 128, 1);
    let state = PipelineState {
        render_target: Some(target),
        ..Default::default()
    };
    backend.clear(&state, Some([0.0; 4]), None, None);
    backend.driver_mut().take_calls();

    backend.remove_render_target(target);
    let calls = backend.driver_mut().take_calls();
    assert_eq!(calls.first(), Some(&TraceCall::BindFramebuffer(0)));
    assert!(calls.iter().any(|c| matches!(c, TraceCall::DeleteFramebuffer(_))));
    assert_eq!(backend.target_build_state(target), None);
}
