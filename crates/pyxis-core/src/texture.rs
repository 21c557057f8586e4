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

//! Texture descriptors and formats.

/// The texel format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// One 8-bit unsigned normalized channel.
    R8,
    /// Two 8-bit unsigned normalized channels.
    Rg8,
    /// Three 8-bit unsigned normalized channels.
    Rgb8,
    /// Four 8-bit unsigned normalized channels.
    Rgba8,
    /// Four 8-bit channels with sRGB color-space conversion.
    Srgba8,
    /// Four 16-bit float channels.
    Rgba16Float,
    /// Four 32-bit float channels.
    Rgba32Float,
    /// 24-bit depth plus 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Size of one texel in bytes.
    pub const fn bytes_per_texel(&self) -> u32 {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rg8 => 2,
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8 | TextureFormat::Srgba8 => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
            TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Depth32Float => 4,
        }
    }

    /// Whether the format carries depth (and possibly stencil) data.
    pub const fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth24PlusStencil8 | TextureFormat::Depth32Float
        )
    }
}

/// How many mipmap levels a texture carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MipPolicy {
    /// Base level only.
    #[default]
    None,
    /// An explicit level count, uploaded by the caller.
    Levels(u32),
    /// The driver generates the full chain from the base level.
    FullChain,
}

/// A descriptor used to create a texture or cubemap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Width of the base level in texels.
    pub width: u32,
    /// Height of the base level in texels.
    pub height: u32,
    /// Texel format.
    pub format: TextureFormat,
    /// Mipmap policy.
    pub mips: MipPolicy,
}

impl TextureDescriptor {
    /// Byte size of one tightly packed base-level image.
    pub fn base_level_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_texel() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_level_size_is_tightly_packed() {
        let desc = TextureDescriptor {
            width: 4,
            height: 2,
            format: TextureFormat::Rgba8,
            mips: MipPolicy::None,
        };
        assert_eq!(desc.base_level_size(), 4 * 2 * 4);
    }

    #[test]
    fn depth_formats_are_flagged() {
        assert!(TextureFormat::Depth32Float.is_depth());
        assert!(TextureFormat::Depth24PlusStencil8.is_depth());
        assert!(!TextureFormat::Rgba8.is_depth());
    }
}
