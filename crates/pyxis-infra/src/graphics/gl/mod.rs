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

//! GL-style backend: the driver contract, the state-diffing backend built on
//! it, and a recording driver for headless testing.

pub mod backend;
pub mod driver;
mod shader;
mod target;
pub mod trace;

pub use backend::GlBackend;
pub use driver::{BufferKind, GlDriver, GlName, ShaderStageKind};
pub use trace::{TraceCall, TraceCaps, TraceDriver};
