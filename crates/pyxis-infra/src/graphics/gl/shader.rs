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

//! Shader compilation and source-level reflection.
//!
//! The driver exposes no reflection API beyond uniform locations, so the
//! binding table is recovered by scanning the source text for `uniform` and
//! vertex-input declarations. The scan is deliberately shallow: it reads one
//! declaration per line, which is what the engine's own shader corpus looks
//! like, and reports anything it cannot classify as a reflection error
//! rather than guessing.

use pyxis_core::error::ShaderError;
use pyxis_core::shader::{ShaderBindingTable, UniformDeclaration, UniformKind};

use super::driver::{GlDriver, GlName, ShaderStageKind};

/// Compiles and links a program from vertex and fragment source. Stages are
/// deleted once linked; on any failure every intermediate object is cleaned
/// up before the error is returned.
pub(crate) fn compile_program(
    driver: &mut dyn GlDriver,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<GlName, ShaderError> {
    let vertex = driver
        .compile_stage(ShaderStageKind::Vertex, vertex_src)
        .map_err(|details| ShaderError::CompilationError {
            stage: "vertex".into(),
            details,
        })?;
    let fragment = match driver.compile_stage(ShaderStageKind::Fragment, fragment_src) {
        Ok(name) => name,
        Err(details) => {
            driver.delete_stage(vertex);
            return Err(ShaderError::CompilationError {
                stage: "fragment".into(),
                details,
            });
        }
    };
    let linked = driver.link_program(vertex, fragment);
    driver.delete_stage(vertex);
    driver.delete_stage(fragment);
    linked.map_err(|details| ShaderError::LinkError { details })
}

/// Builds the binding table for a linked program by reflecting both sources
/// and resolving each uniform's location through the driver.
///
/// The driver may have optimized a declared uniform out entirely; those come
/// back with location `-1` and stay in the table so `set_uniform` can treat
/// them as cheap no-ops instead of unknown names.
pub(crate) fn reflect_program(
    driver: &mut dyn GlDriver,
    program: GlName,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<ShaderBindingTable, ShaderError> {
    let mut declarations: Vec<UniformDeclaration> = Vec::new();
    for source in [vertex_src, fragment_src] {
        for (name, kind, array_len) in scan_uniforms(source)? {
            // The same uniform may legally be declared in both stages.
            if declarations.iter().any(|d| d.name == name) {
                continue;
            }
            let location = driver.uniform_location(program, &name);
            declarations.push(UniformDeclaration {
                name,
                kind,
                array_len,
                location,
            });
        }
    }
    let attributes = scan_attributes(vertex_src);
    Ok(ShaderBindingTable::new(declarations, attributes))
}

/// Extracts `uniform <type> <name>[len];` declarations from one stage.
fn scan_uniforms(source: &str) -> Result<Vec<(String, UniformKind, u32)>, ShaderError> {
    let mut found = Vec::new();
    for line in source.lines() {
        let line = strip_comment(line).trim();
        let Some(rest) = line.strip_prefix("uniform ") else {
            continue;
        };
        let mut tokens = rest.split_whitespace();
        let (Some(type_name), Some(identifier)) = (tokens.next(), tokens.next()) else {
            return Err(ShaderError::ReflectionError {
                declaration: line.to_string(),
            });
        };
        let kind = parse_kind(type_name).ok_or_else(|| ShaderError::ReflectionError {
            declaration: line.to_string(),
        })?;
        let (name, array_len) =
            parse_identifier(identifier).ok_or_else(|| ShaderError::ReflectionError {
                declaration: line.to_string(),
            })?;
        found.push((name, kind, array_len));
    }
    Ok(found)
}

/// Extracts vertex-input names from the vertex stage. Both the legacy
/// `attribute` keyword and `in` (with an optional `layout(...)` qualifier)
/// are recognized.
fn scan_attributes(vertex_src: &str) -> Vec<String> {
    let mut found = Vec::new();
    for line in vertex_src.lines() {
        let mut line = strip_comment(line).trim();
        if let Some(close) = line.strip_prefix("layout").and_then(|l| l.find(')')) {
            line = line["layout".len() + close + 1..].trim_start();
        }
        let rest = match line
            .strip_prefix("attribute ")
            .or_else(|| line.strip_prefix("in "))
        {
            Some(rest) => rest,
            None => continue,
        };
        let mut tokens = rest.split_whitespace();
        let (Some(_type_name), Some(identifier)) = (tokens.next(), tokens.next()) else {
            continue;
        };
        if let Some((name, _)) = parse_identifier(identifier) {
            found.push(name);
        }
    }
    found
}

fn parse_kind(type_name: &str) -> Option<UniformKind> {
    match type_name {
        "float" => Some(UniformKind::Float),
        "vec2" => Some(UniformKind::Vec2),
        "vec3" => Some(UniformKind::Vec3),
        "vec4" => Some(UniformKind::Vec4),
        "mat4" => Some(UniformKind::Mat4),
        "sampler2D" => Some(UniformKind::Sampler2D),
        "samplerCube" => Some(UniformKind::SamplerCube),
        _ => None,
    }
}

/// Splits `name`, `name;` or `name[8];` into the bare name and element
/// count.
fn parse_identifier(token: &str) -> Option<(String, u32)> {
    let token = token.trim_end_matches(';');
    if let Some(open) = token.find('[') {
        let close = token.find(']')?;
        let len: u32 = token.get(open + 1..close)?.parse().ok()?;
        if len == 0 {
            return None;
        }
        Some((token[..open].to_string(), len))
    } else if token.is_empty() {
        None
    } else {
        Some((token.to_string(), 1))
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(index) => &line[..index],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r"
        layout(location = 0) in vec3 a_position;
        in vec2 a_uv; // interpolated below
        uniform mat4 u_mvp;
        uniform vec4 u_tint;
    ";

    const FRAGMENT: &str = r"
        uniform vec4 u_tint;
        uniform sampler2D u_albedo;
        uniform float u_weights[4];
    ";

    #[test]
    fn uniforms_are_scanned_with_kinds_and_array_lengths() {
        let uniforms = scan_uniforms(FRAGMENT).unwrap();
        assert_eq!(
            uniforms,
            vec![
                ("u_tint".to_string(), UniformKind::Vec4, 1),
                ("u_albedo".to_string(), UniformKind::Sampler2D, 1),
                ("u_weights".to_string(), UniformKind::Float, 4),
            ]
        );
    }

    #[test]
    fn attributes_ignore_layout_qualifiers_and_comments() {
        assert_eq!(scan_attributes(VERTEX), vec!["a_position", "a_uv"]);
    }

    #[test]
    fn unknown_uniform_type_is_a_reflection_error() {
        let result = scan_uniforms("uniform mat3 u_normal_matrix;");
        assert!(matches!(
            result,
            Err(ShaderError::ReflectionError { declaration }) if declaration.contains("mat3")
        ));
    }

    #[test]
    fn duplicate_declarations_across_stages_collapse() {
        let mut driver = super::super::trace::TraceDriver::new();
        let table = reflect_program(&mut driver, 1, VERTEX, FRAGMENT).unwrap();
        let tints = table
            .uniforms()
            .iter()
            .filter(|u| u.name == "u_tint")
            .count();
        assert_eq!(tints, 1);
    }
}
