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

//! Concrete backend implementations for the pyxis rendering core.
//!
//! `pyxis-core` defines the contracts ([`RenderBackend`](pyxis_core::traits::RenderBackend)
//! and the resource vocabulary); this crate provides the GL-style
//! implementation: a stateful driver abstraction, the diffing backend on top
//! of it, and a recording driver for tests.

#![warn(missing_docs)]

pub mod graphics;

pub use graphics::gl::{GlBackend, GlDriver, TraceDriver};
