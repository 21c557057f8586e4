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

//! Lazy framebuffer construction and multisample resolution.
//!
//! A render target is registered as a descriptor only; its driver objects are
//! (re)built the first time the target is bound after a descriptor change.
//! Multisampled targets get a second framebuffer backed by renderbuffers:
//! rendering happens there, and [`resolve`] blits each color slot into the
//! backing texture before anything samples it.

use log::{error, warn};
use pyxis_core::pool::ResourcePool;
use pyxis_core::target::{RenderTargetDescriptor, TargetBuildState};

use super::backend::{TextureBinding, TextureResource};
use super::driver::{GlDriver, GlName};

/// The driver-side incarnation of one render target.
pub(crate) struct TargetResource {
    pub descriptor: RenderTargetDescriptor,
    pub build: TargetBuildState,
    /// The resolve framebuffer, whose color slots are the backing textures.
    pub framebuffer: GlName,
    /// The multisampled framebuffer rendering goes to, `0` when samples <= 1.
    pub msaa_framebuffer: GlName,
    pub msaa_renderbuffers: Vec<GlName>,
    /// The effective sample count of the last build, after clamping.
    pub samples: u32,
}

impl TargetResource {
    pub fn new(descriptor: RenderTargetDescriptor) -> Self {
        Self {
            descriptor,
            build: TargetBuildState::Unbuilt,
            framebuffer: 0,
            msaa_framebuffer: 0,
            msaa_renderbuffers: Vec::new(),
            samples: 1,
        }
    }

    /// The framebuffer draws are directed at.
    pub fn draw_framebuffer(&self) -> GlName {
        if self.msaa_framebuffer != 0 {
            self.msaa_framebuffer
        } else {
            self.framebuffer
        }
    }
}

/// (Re)builds the target's driver objects from its descriptor.
///
/// Any previous incarnation must already be destroyed. Returns the
/// framebuffer name left bound on the driver so the caller can reconcile its
/// applied-state cache.
pub(crate) fn build(
    driver: &mut dyn GlDriver,
    textures: &ResourcePool<TextureResource>,
    target: &mut TargetResource,
) -> GlName {
    let samples = target.descriptor.samples.max(1).min(driver.max_samples());
    if samples != target.descriptor.samples.max(1) {
        warn!(
            "render target sample count {} clamped to driver maximum {samples}",
            target.descriptor.samples
        );
    }

    let framebuffer = driver.create_framebuffer();
    driver.bind_framebuffer(framebuffer);
    let mut color_count = 0;
    for (slot, attachment) in target.descriptor.color_attachments() {
        let Some(texture) = textures.get(attachment.texture) else {
            warn!("render target color slot {slot} references a dead texture handle");
            continue;
        };
        match attachment.face {
            Some(face) => driver.attach_color_cube_face(slot as u32, texture.texture, face, 0),
            None => driver.attach_color_texture(slot as u32, texture.texture, 0),
        }
        color_count = color_count.max(slot as u32 + 1);
    }
    if let Some(depth) = target.descriptor.depth {
        match textures.get(depth) {
            Some(texture) => driver.attach_depth_texture(texture.texture),
            None => warn!("render target depth attachment references a dead texture handle"),
        }
    }
    if target.descriptor.is_depth_only() {
        driver.set_draw_buffers(0);
        driver.set_read_buffer(None);
    } else {
        driver.set_draw_buffers(color_count);
        driver.set_read_buffer(Some(0));
    }
    if !driver.framebuffer_complete() {
        error!("render target framebuffer is incomplete");
    }
    target.framebuffer = framebuffer;

    let mut bound = framebuffer;
    if samples > 1 {
        let msaa = driver.create_framebuffer();
        driver.bind_framebuffer(msaa);
        for (slot, attachment) in target.descriptor.color_attachments() {
            let Some(texture) = textures.get(attachment.texture) else {
                continue;
            };
            let renderbuffer = driver.create_renderbuffer();
            driver.renderbuffer_storage(
                renderbuffer,
                samples,
                texture.descriptor.format,
                target.descriptor.width,
                target.descriptor.height,
            );
            driver.attach_color_renderbuffer(slot as u32, renderbuffer);
            target.msaa_renderbuffers.push(renderbuffer);
        }
        if let Some(depth) = target.descriptor.depth {
            if let Some(texture) = textures.get(depth) {
                let renderbuffer = driver.create_renderbuffer();
                driver.renderbuffer_storage(
                    renderbuffer,
                    samples,
                    texture.descriptor.format,
                    target.descriptor.width,
                    target.descriptor.height,
                );
                driver.attach_depth_renderbuffer(renderbuffer);
                target.msaa_renderbuffers.push(renderbuffer);
            }
        }
        if target.descriptor.is_depth_only() {
            driver.set_draw_buffers(0);
        } else {
            driver.set_draw_buffers(color_count);
        }
        if !driver.framebuffer_complete() {
            error!("multisampled render target framebuffer is incomplete");
        }
        target.msaa_framebuffer = msaa;
        bound = msaa;
    }

    target.samples = samples;
    target.build = TargetBuildState::Clean;
    bound
}

/// Destroys the target's driver objects, returning it to the unbuilt state.
/// The descriptor survives so the next bind can rebuild.
pub(crate) fn destroy(driver: &mut dyn GlDriver, target: &mut TargetResource) {
    for renderbuffer in target.msaa_renderbuffers.drain(..) {
        driver.delete_renderbuffer(renderbuffer);
    }
    if target.msaa_framebuffer != 0 {
        driver.delete_framebuffer(target.msaa_framebuffer);
        target.msaa_framebuffer = 0;
    }
    if target.framebuffer != 0 {
        driver.delete_framebuffer(target.framebuffer);
        target.framebuffer = 0;
    }
    target.build = TargetBuildState::Unbuilt;
}

/// Resolves rendered content into the backing textures: blits each
/// multisampled color slot, then regenerates mip chains for attachments that
/// asked for them.
///
/// Mip regeneration binds textures on whatever texture unit is active and
/// leaves that unit's binding cleared; the framebuffer binding is left
/// undefined by the blits. The caller reconciles both in its cache.
pub(crate) fn resolve(
    driver: &mut dyn GlDriver,
    textures: &ResourcePool<TextureResource>,
    target: &TargetResource,
) {
    if target.msaa_framebuffer != 0 {
        for (slot, _) in target.descriptor.color_attachments() {
            driver.blit_color(
                target.msaa_framebuffer,
                slot as u32,
                target.framebuffer,
                slot as u32,
                target.descriptor.width,
                target.descriptor.height,
            );
        }
    }
    let mut bound_any_2d = false;
    let mut bound_any_cube = false;
    for (_, attachment) in target.descriptor.color_attachments() {
        if !attachment.generate_mips {
            continue;
        }
        let Some(texture) = textures.get(attachment.texture) else {
            continue;
        };
        match texture.binding {
            TextureBinding::TwoD => {
                driver.bind_texture_2d(texture.texture);
                driver.generate_mipmaps_2d();
                bound_any_2d = true;
            }
            TextureBinding::Cube => {
                driver.bind_texture_cube(texture.texture);
                driver.generate_mipmaps_cube();
                bound_any_cube = true;
            }
        }
    }
    if bound_any_2d {
        driver.bind_texture_2d(0);
    }
    if bound_any_cube {
        driver.bind_texture_cube(0);
    }
}
