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

//! Defines the core architectural traits for the rendering subsystem.
//!
//! - [`RenderBackend`]: the complete operation set a concrete backend must
//!   support. Higher engine layers (scene graph, material system, mesh
//!   renderer) talk only to this trait; a concrete driver backend is
//!   selected once at startup and used as a trait object thereafter.

mod render_backend;

pub use self::render_backend::RenderBackend;
