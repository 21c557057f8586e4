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

//! Off-screen render target descriptors.
//!
//! A target is an ordered list of color attachments plus an optional depth
//! attachment. The descriptor is a plain value; the backend tracks per-target
//! build state ([`TargetBuildState`]) and rebuilds the driver object lazily
//! when the descriptor changes.

use crate::pool::Handle;

/// One face of a cubemap texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    /// +X face.
    PositiveX,
    /// -X face.
    NegativeX,
    /// +Y face.
    PositiveY,
    /// -Y face.
    NegativeY,
    /// +Z face.
    PositiveZ,
    /// -Z face.
    NegativeZ,
}

impl CubeFace {
    /// The face's driver-side index (+X = 0 .. -Z = 5).
    pub const fn index(&self) -> u32 {
        match self {
            CubeFace::PositiveX => 0,
            CubeFace::NegativeX => 1,
            CubeFace::PositiveY => 2,
            CubeFace::NegativeY => 3,
            CubeFace::PositiveZ => 4,
            CubeFace::NegativeZ => 5,
        }
    }
}

/// A color attachment slot of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorAttachment {
    /// The backing texture.
    pub texture: Handle,
    /// For cubemap textures, the face rendered into.
    pub face: Option<CubeFace>,
    /// Regenerate the texture's mip chain after each resolve.
    pub generate_mips: bool,
}

/// The build state of a render target's driver object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetBuildState {
    /// No driver object exists yet.
    #[default]
    Unbuilt,
    /// The driver object matches the descriptor.
    Clean,
    /// The descriptor changed since the driver object was built; the next
    /// bind destroys and rebuilds it.
    Dirty,
}

/// Describes an off-screen render target.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDescriptor {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Requested sample count (1 = no multisampling).
    pub samples: u32,
    /// Ordered color attachment slots; `None` = slot unused.
    pub color: Vec<Option<ColorAttachment>>,
    /// Optional depth attachment texture.
    pub depth: Option<Handle>,
}

impl RenderTargetDescriptor {
    /// Creates a descriptor with the given dimensions, no attachments and no
    /// multisampling.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            samples: 1,
            color: Vec::new(),
            depth: None,
        }
    }

    /// Sets (or clears) the color attachment at `slot`, growing the slot list
    /// as needed. Returns `true` if the descriptor actually changed.
    pub fn set_color_attachment(
        &mut self,
        slot: usize,
        attachment: Option<ColorAttachment>,
    ) -> bool {
        if slot >= self.color.len() {
            if attachment.is_none() {
                return false;
            }
            self.color.resize(slot + 1, None);
        }
        if self.color[slot] == attachment {
            return false;
        }
        self.color[slot] = attachment;
        true
    }

    /// Sets (or clears) the depth attachment. Returns `true` if it changed.
    pub fn set_depth_attachment(&mut self, depth: Option<Handle>) -> bool {
        if self.depth == depth {
            return false;
        }
        self.depth = depth;
        true
    }

    /// Resizes the target. Returns `true` if the dimensions changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    /// Changes the sample count. Returns `true` if it changed.
    pub fn set_samples(&mut self, samples: u32) -> bool {
        if self.samples == samples {
            return false;
        }
        self.samples = samples;
        true
    }

    /// Whether the target has no color attachments (depth-only rendering).
    pub fn is_depth_only(&self) -> bool {
        self.color.iter().all(Option::is_none)
    }

    /// Number of populated color attachment slots.
    pub fn color_attachment_count(&self) -> usize {
        self.color.iter().filter(|slot| slot.is_some()).count()
    }

    /// Iterates over populated `(slot, attachment)` pairs.
    pub fn color_attachments(&self) -> impl Iterator<Item = (usize, &ColorAttachment)> {
        self.color
            .iter()
            .enumerate()
            .filter_map(|(slot, attachment)| attachment.as_ref().map(|a| (slot, a)))
    }
}
