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

//! The vertex/index layout model.
//!
//! A [`VertexLayout`] describes how raw buffer bytes map to vertex
//! attributes. The backend consults it when binding a draw; mutating a layout
//! bumps its revision, which invalidates any backend-side compiled binding
//! (e.g. a vertex-array object) so it is rebuilt lazily on next bind.

/// The number of texture-coordinate channels a layout can carry.
pub const MAX_TEXCOORD_CHANNELS: u8 = 4;

/// The semantic meaning of a vertex attribute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeKind {
    /// Object-space position.
    Position,
    /// Surface normal.
    Normal,
    /// Per-vertex color.
    Color,
    /// A texture-coordinate channel (`0..MAX_TEXCOORD_CHANNELS`).
    TexCoord(u8),
}

impl VertexAttributeKind {
    /// A fixed shader input location for this attribute kind.
    ///
    /// Position 0, Normal 1, Color 2, texcoord channels from 3 upward.
    pub fn shader_location(&self) -> u32 {
        match self {
            VertexAttributeKind::Position => 0,
            VertexAttributeKind::Normal => 1,
            VertexAttributeKind::Color => 2,
            VertexAttributeKind::TexCoord(channel) => 3 + u32::from(*channel),
        }
    }
}

/// The storage kind of a single attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeComponentKind {
    /// 16-bit float.
    F16,
    /// 32-bit float.
    F32,
    /// 8-bit unsigned integer, normalized to `[0.0, 1.0]`.
    U8,
}

impl AttributeComponentKind {
    /// Size of one component in bytes.
    pub const fn size(&self) -> u32 {
        match self {
            AttributeComponentKind::F16 => 2,
            AttributeComponentKind::F32 => 4,
            AttributeComponentKind::U8 => 1,
        }
    }

    /// Whether the component is integer data normalized on fetch.
    pub const fn is_normalized(&self) -> bool {
        matches!(self, AttributeComponentKind::U8)
    }
}

/// One attribute slot within a vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// The semantic slot this attribute fills.
    pub kind: VertexAttributeKind,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
    /// Number of components (1-4).
    pub component_count: u8,
    /// Storage kind of each component.
    pub component_kind: AttributeComponentKind,
}

/// A set of named attribute slots plus the vertex stride.
///
/// The `revision` counter increases on every mutation; backends key their
/// compiled bindings on it.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    stride: u32,
    attributes: Vec<VertexAttribute>,
    revision: u64,
}

impl VertexLayout {
    /// Creates an empty layout with the given vertex stride in bytes.
    pub fn new(stride: u32) -> Self {
        Self {
            stride,
            attributes: Vec::new(),
            revision: 0,
        }
    }

    /// The byte distance between consecutive vertices.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Changes the vertex stride.
    pub fn set_stride(&mut self, stride: u32) {
        if self.stride != stride {
            self.stride = stride;
            self.revision += 1;
        }
    }

    /// Adds an attribute, or replaces the existing attribute of the same
    /// kind. Re-setting an attribute to its current value does not bump the
    /// revision.
    pub fn set_attribute(&mut self, attribute: VertexAttribute) {
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.kind == attribute.kind)
        {
            if *existing != attribute {
                *existing = attribute;
                self.revision += 1;
            }
        } else {
            self.attributes.push(attribute);
            self.revision += 1;
        }
    }

    /// Removes the attribute of the given kind, if present.
    pub fn remove_attribute(&mut self, kind: VertexAttributeKind) {
        let before = self.attributes.len();
        self.attributes.retain(|a| a.kind != kind);
        if self.attributes.len() != before {
            self.revision += 1;
        }
    }

    /// Looks up the attribute of the given kind.
    pub fn attribute(&self, kind: VertexAttributeKind) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.kind == kind)
    }

    /// All attributes, in insertion order.
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// The mutation counter backends key compiled bindings on.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// The element size of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit (2-byte) indices.
    U16,
    /// 32-bit (4-byte) indices.
    U32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub const fn size(&self) -> u32 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// A hint describing how often buffer contents will be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    #[default]
    Static,
    /// Rewritten occasionally.
    Dynamic,
    /// Rewritten every frame.
    Stream,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_f32() -> VertexAttribute {
        VertexAttribute {
            kind: VertexAttributeKind::Position,
            offset: 0,
            component_count: 3,
            component_kind: AttributeComponentKind::F32,
        }
    }

    #[test]
    fn set_attribute_bumps_revision_only_on_change() {
        let mut layout = VertexLayout::new(12);
        layout.set_attribute(position_f32());
        let after_insert = layout.revision();

        // Same value again: compiled bindings stay valid.
        layout.set_attribute(position_f32());
        assert_eq!(layout.revision(), after_insert);

        // Different value for the same slot: must invalidate.
        layout.set_attribute(VertexAttribute {
            component_count: 2,
            ..position_f32()
        });
        assert!(layout.revision() > after_insert);
    }

    #[test]
    fn remove_attribute_bumps_revision_when_present() {
        let mut layout = VertexLayout::new(12);
        layout.set_attribute(position_f32());
        let rev = layout.revision();
        layout.remove_attribute(VertexAttributeKind::Normal);
        assert_eq!(layout.revision(), rev);
        layout.remove_attribute(VertexAttributeKind::Position);
        assert!(layout.revision() > rev);
        assert!(layout.attribute(VertexAttributeKind::Position).is_none());
    }

    #[test]
    fn texcoord_channels_get_distinct_locations() {
        assert_ne!(
            VertexAttributeKind::TexCoord(0).shader_location(),
            VertexAttributeKind::TexCoord(1).shader_location()
        );
        assert_eq!(VertexAttributeKind::TexCoord(0).shader_location(), 3);
    }

    #[test]
    fn index_format_sizes() {
        assert_eq!(IndexFormat::U16.size(), 2);
        assert_eq!(IndexFormat::U32.size(), 4);
    }
}
