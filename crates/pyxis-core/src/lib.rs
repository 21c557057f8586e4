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

//! # Pyxis Core
//!
//! Backend-agnostic contracts for the rendering hardware-abstraction layer.
//!
//! This crate defines the "common language" for all rendering operations:
//! the handle/pool model every GPU-owned object lives in, the plain value
//! types describing pipeline state, vertex layouts, textures, render targets
//! and shader bindings, the error hierarchy, and the [`RenderBackend`] trait
//! that concrete backends (see `pyxis-infra`) implement. It defines the
//! *what* of rendering; the *how* lives behind the trait.

#![warn(missing_docs)]

pub mod error;
pub mod layout;
pub mod pool;
pub mod shader;
pub mod state;
pub mod target;
pub mod texture;
pub mod traits;
pub mod utils;

pub use self::error::{DriverDiagnostic, RenderError, ResourceError, ShaderError};
pub use self::layout::{
    AttributeComponentKind, BufferUsage, IndexFormat, VertexAttribute, VertexAttributeKind,
    VertexLayout, MAX_TEXCOORD_CHANNELS,
};
pub use self::pool::{Handle, ResourcePool};
pub use self::shader::{
    PredefinedMatrix, ShaderBindingTable, UniformDeclaration, UniformDescriptor, UniformKind,
};
pub use self::state::{
    BlendFactor, ClearFlags, ColorWrites, CompareFunction, FrontFace, PipelineState,
    PrimitiveTopology, Rect, MAX_TEXTURE_UNITS,
};
pub use self::target::{
    ColorAttachment, CubeFace, RenderTargetDescriptor, TargetBuildState,
};
pub use self::texture::{MipPolicy, TextureDescriptor, TextureFormat};
pub use self::traits::RenderBackend;
