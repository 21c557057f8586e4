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

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! Creation failures are reported through these types and logged; they never
//! terminate the process. Degraded rendering is the user-visible outcome.

use std::fmt;

/// An error related to compiling, linking, or reflecting a shader.
#[derive(Debug)]
pub enum ShaderError {
    /// A shader stage failed to compile.
    CompilationError {
        /// Which stage failed ("vertex" or "fragment").
        stage: String,
        /// Detailed error messages from the shader compiler.
        details: String,
    },
    /// The compiled stages failed to link into a program.
    LinkError {
        /// Detailed error messages from the linker.
        details: String,
    },
    /// The source-level reflection pass could not parse a declaration.
    ReflectionError {
        /// The offending declaration.
        declaration: String,
    },
    /// A cached program binary could not be loaded by the driver.
    BinaryLoadError {
        /// The driver-defined format tag carried by the blob.
        format_tag: u32,
    },
    /// No uniform with the given name exists in the shader.
    UnknownUniform {
        /// The requested uniform name.
        name: String,
    },
    /// A uniform was set with data that does not match its declaration.
    UniformMismatch {
        /// The uniform name.
        name: String,
        /// What was wrong.
        details: String,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationError { stage, details } => {
                write!(f, "Shader {stage} stage failed to compile: {details}")
            }
            ShaderError::LinkError { details } => {
                write!(f, "Shader program failed to link: {details}")
            }
            ShaderError::ReflectionError { declaration } => {
                write!(f, "Could not reflect shader declaration: '{declaration}'")
            }
            ShaderError::BinaryLoadError { format_tag } => {
                write!(
                    f,
                    "Driver rejected cached program binary with format tag {format_tag:#x}"
                )
            }
            ShaderError::UnknownUniform { name } => {
                write!(f, "Unknown uniform '{name}'")
            }
            ShaderError::UniformMismatch { name, details } => {
                write!(f, "Uniform '{name}' set with mismatched data: {details}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// The handle used to reference a resource is dead, stale, or out of
    /// range.
    InvalidHandle,
    /// The descriptor or data handed to a creation call is unusable.
    InvalidDescriptor(String),
    /// The requested texture format is not supported by the driver.
    UnsupportedFormat,
    /// An attempt was made to access a resource out of its bounds.
    OutOfBounds,
    /// An error originating from the specific backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle."),
            ResourceError::InvalidDescriptor(msg) => {
                write!(f, "Invalid resource descriptor: {msg}")
            }
            ResourceError::UnsupportedFormat => {
                write!(f, "Texture format not supported by the driver.")
            }
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

/// A high-level error surfaced by frame operations.
#[derive(Debug)]
pub enum RenderError {
    /// An error occurred while managing a GPU resource.
    Resource(ResourceError),
    /// The requested operation needs a capability the driver lacks.
    CapabilityUnsupported(String),
    /// The pipeline state handed to a frame operation is inconsistent.
    InvalidState(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Resource(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::CapabilityUnsupported(msg) => {
                write!(f, "Capability not supported by the driver: {msg}")
            }
            RenderError::InvalidState(msg) => {
                write!(f, "Invalid pipeline state: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Resource(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::Resource(err)
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::Resource(ResourceError::Shader(err))
    }
}

/// A deferred driver-level diagnostic, drained in batches rather than
/// surfaced per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverDiagnostic {
    /// The driver-defined error code.
    pub code: u32,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for DriverDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "driver error {:#x}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::CompilationError {
            stage: "vertex".to_string(),
            details: "syntax error at line 5".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Shader vertex stage failed to compile: syntax error at line 5"
        );
    }

    #[test]
    fn resource_error_display_wrapping_shader_error() {
        let shader_err = ShaderError::UnknownUniform {
            name: "u_missing".to_string(),
        };
        let res_err: ResourceError = shader_err.into();
        assert_eq!(
            format!("{res_err}"),
            "Shader resource error: Unknown uniform 'u_missing'"
        );
        assert!(res_err.source().is_some());
    }

    #[test]
    fn render_error_display_wrapping_resource_error() {
        let err: RenderError = ResourceError::InvalidHandle.into();
        assert_eq!(
            format!("{err}"),
            "Graphics resource operation failed: Invalid resource handle."
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn driver_diagnostic_display() {
        let diag = DriverDiagnostic {
            code: 0x505,
            message: "out of memory".to_string(),
        };
        assert_eq!(format!("{diag}"), "driver error 0x505: out of memory");
    }
}
