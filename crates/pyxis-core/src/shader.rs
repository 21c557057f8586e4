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

//! The shader binding table: reflected uniform/attribute declarations plus a
//! client-side cache of last-uploaded uniform values.
//!
//! The cache lets the backend skip driver uploads whose data is bit-identical
//! to what the driver already holds. This is correctness-preserving only if
//! every upload routes through the single setter, which the backend enforces.

use crate::error::ShaderError;

/// The declared kind of a shader uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// A single float.
    Float,
    /// A 2-component float vector.
    Vec2,
    /// A 3-component float vector.
    Vec3,
    /// A 4-component float vector.
    Vec4,
    /// A 4x4 float matrix.
    Mat4,
    /// A 2D texture sampler.
    Sampler2D,
    /// A cubemap texture sampler.
    SamplerCube,
}

impl UniformKind {
    /// The number of floats one element of this kind uploads.
    pub const fn float_count(&self) -> usize {
        match self {
            UniformKind::Float => 1,
            UniformKind::Vec2 => 2,
            UniformKind::Vec3 => 3,
            UniformKind::Vec4 => 4,
            UniformKind::Mat4 => 16,
            UniformKind::Sampler2D | UniformKind::SamplerCube => 0,
        }
    }

    /// The cache slot size of one element: scalars and vectors are padded to
    /// 4 floats, matrices take 16, samplers carry no cache slot.
    pub const fn cache_floats(&self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Vec2 | UniformKind::Vec3 | UniformKind::Vec4 => 4,
            UniformKind::Mat4 => 16,
            UniformKind::Sampler2D | UniformKind::SamplerCube => 0,
        }
    }

    /// Whether this uniform samples a texture.
    pub const fn is_sampler(&self) -> bool {
        matches!(self, UniformKind::Sampler2D | UniformKind::SamplerCube)
    }
}

/// The matrix uniforms the backend fills automatically every draw when a
/// shader declares them by reserved name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredefinedMatrix {
    /// `u_mvp` — model-view-projection.
    ModelViewProjection,
    /// `u_model_view` — model-view.
    ModelView,
    /// `u_projection` — projection.
    Projection,
}

impl PredefinedMatrix {
    /// All predefined slots, in table order.
    pub const ALL: [PredefinedMatrix; 3] = [
        PredefinedMatrix::ModelViewProjection,
        PredefinedMatrix::ModelView,
        PredefinedMatrix::Projection,
    ];

    /// The reserved uniform name for this slot.
    pub const fn reserved_name(&self) -> &'static str {
        match self {
            PredefinedMatrix::ModelViewProjection => "u_mvp",
            PredefinedMatrix::ModelView => "u_model_view",
            PredefinedMatrix::Projection => "u_projection",
        }
    }

    /// Maps a uniform name onto its predefined slot, if it is reserved.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.reserved_name() == name)
    }

    const fn table_index(&self) -> usize {
        match self {
            PredefinedMatrix::ModelViewProjection => 0,
            PredefinedMatrix::ModelView => 1,
            PredefinedMatrix::Projection => 2,
        }
    }
}

/// A uniform extracted from shader source, as handed to the binding table.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformDeclaration {
    /// Declared name.
    pub name: String,
    /// Declared kind.
    pub kind: UniformKind,
    /// Declared array length (1 for non-arrays).
    pub array_len: u32,
    /// Driver-level location (-1 if the driver optimized the uniform out).
    pub location: i32,
}

/// A fully resolved uniform entry in a [`ShaderBindingTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct UniformDescriptor {
    /// Declared name.
    pub name: String,
    /// Declared kind.
    pub kind: UniformKind,
    /// Declared array length (1 for non-arrays).
    pub array_len: u32,
    /// Driver-level location.
    pub location: i32,
    /// For samplers, the texture unit assigned at bind time.
    pub texture_unit: Option<u32>,
    /// Offset of this uniform's slot in the flat value cache.
    pub cache_offset: usize,
}

/// Reflected bindings for one compiled shader, plus the uniform value cache.
#[derive(Debug, Clone)]
pub struct ShaderBindingTable {
    uniforms: Vec<UniformDescriptor>,
    attributes: Vec<String>,
    predefined: [Option<usize>; 3],
    cache: Vec<f32>,
    written: Vec<bool>,
}

impl ShaderBindingTable {
    /// Builds the table from reflected declarations.
    ///
    /// Sampler uniforms are assigned sequential texture units in declaration
    /// order; non-sampler uniforms get a cache slot sized to their element
    /// count; predefined matrix slots are detected by reserved name.
    pub fn new(declarations: Vec<UniformDeclaration>, attributes: Vec<String>) -> Self {
        let mut uniforms = Vec::with_capacity(declarations.len());
        let mut predefined = [None; 3];
        let mut cache_len = 0usize;
        let mut next_unit = 0u32;

        for declaration in declarations {
            let texture_unit = if declaration.kind.is_sampler() {
                let unit = next_unit;
                next_unit += 1;
                Some(unit)
            } else {
                None
            };
            if let Some(slot) = PredefinedMatrix::from_name(&declaration.name) {
                predefined[slot.table_index()] = Some(uniforms.len());
            }
            let cache_offset = cache_len;
            cache_len += declaration.kind.cache_floats() * declaration.array_len as usize;
            uniforms.push(UniformDescriptor {
                name: declaration.name,
                kind: declaration.kind,
                array_len: declaration.array_len,
                location: declaration.location,
                texture_unit,
                cache_offset,
            });
        }

        let written = vec![false; uniforms.len()];
        Self {
            uniforms,
            attributes,
            predefined,
            cache: vec![0.0; cache_len],
            written,
        }
    }

    /// All uniforms, in declaration order.
    pub fn uniforms(&self) -> &[UniformDescriptor] {
        &self.uniforms
    }

    /// All attribute names, in declaration order.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Looks up a uniform by name.
    pub fn uniform(&self, name: &str) -> Option<&UniformDescriptor> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    /// Looks up a uniform's table index by name.
    pub fn uniform_index(&self, name: &str) -> Option<usize> {
        self.uniforms.iter().position(|u| u.name == name)
    }

    /// The uniform backing a predefined matrix slot, if the shader declares
    /// its reserved name.
    pub fn predefined(&self, slot: PredefinedMatrix) -> Option<&UniformDescriptor> {
        self.predefined[slot.table_index()].map(|index| &self.uniforms[index])
    }

    /// Compares `data` against the cached value of the uniform at `index`
    /// and stores it. Returns `Ok(true)` when the data differs (the caller
    /// must upload) and `Ok(false)` on a bit-identical cache hit.
    pub fn update_cache(&mut self, index: usize, data: &[f32]) -> Result<bool, ShaderError> {
        let uniform = self
            .uniforms
            .get(index)
            .ok_or_else(|| ShaderError::UnknownUniform {
                name: format!("#{index}"),
            })?;
        if uniform.kind.is_sampler() {
            return Err(ShaderError::UniformMismatch {
                name: uniform.name.clone(),
                details: "sampler uniforms are bound to fixed texture units".to_string(),
            });
        }
        let expected = uniform.kind.float_count() * uniform.array_len as usize;
        if data.len() != expected {
            return Err(ShaderError::UniformMismatch {
                name: uniform.name.clone(),
                details: format!("expected {expected} floats, got {}", data.len()),
            });
        }
        let offset = uniform.cache_offset;
        let slot = &mut self.cache[offset..offset + data.len()];
        // Bit-compare: an upload counts as redundant only when the bytes are
        // identical to what the driver already holds.
        let identical = self.written[index]
            && slot
                .iter()
                .zip(data.iter())
                .all(|(cached, new)| cached.to_bits() == new.to_bits());
        if identical {
            return Ok(false);
        }
        slot.copy_from_slice(data);
        self.written[index] = true;
        Ok(true)
    }
}
