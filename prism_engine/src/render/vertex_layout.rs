/// Vertex input layout derived from vertex-stage reflection
///
/// Every input lives in one interleaved vertex buffer (binding 0). Attributes
/// are ordered by location, offsets are a running sum and the stride is the
/// total byte size. Matrices take one location per column.

use crate::error::Result;
use crate::render::reflection::{ReflectedType, ReflectedVariable, ScalarKind};
use crate::render::types::TextureFormat;

const SOURCE: &str = "prism::shader";

/// One vertex attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: String,
    pub location: u32,
    pub format: TextureFormat,
    pub offset: u32,
    pub size: u32,
}

/// Interleaved single-binding vertex layout
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// True when the shader consumes no vertex buffer at all
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Format of a 32-bit vertex attribute with 1..=4 components
pub fn attribute_format(kind: ScalarKind, bits: u32, components: u32) -> Option<TextureFormat> {
    use TextureFormat as F;
    if bits != 32 {
        return None;
    }
    let format = match (kind, components) {
        (ScalarKind::Float, 1) => F::R32Sfloat,
        (ScalarKind::Float, 2) => F::R32G32Sfloat,
        (ScalarKind::Float, 3) => F::R32G32B32Sfloat,
        (ScalarKind::Float, 4) => F::R32G32B32A32Sfloat,
        (ScalarKind::Int, 1) => F::R32Sint,
        (ScalarKind::Int, 2) => F::R32G32Sint,
        (ScalarKind::Int, 3) => F::R32G32B32Sint,
        (ScalarKind::Int, 4) => F::R32G32B32A32Sint,
        (ScalarKind::Uint | ScalarKind::Bool, 1) => F::R32Uint,
        (ScalarKind::Uint | ScalarKind::Bool, 2) => F::R32G32Uint,
        (ScalarKind::Uint | ScalarKind::Bool, 3) => F::R32G32B32Uint,
        (ScalarKind::Uint | ScalarKind::Bool, 4) => F::R32G32B32A32Uint,
        _ => return None,
    };
    Some(format)
}

/// True for inputs that never come from a vertex buffer
fn is_builtin(input: &ReflectedVariable) -> bool {
    input.name.starts_with("gl_") || input.location.is_none()
}

/// Derive the vertex layout of a vertex stage
pub fn derive_vertex_layout(inputs: &[ReflectedVariable]) -> Result<VertexLayout> {
    // (location, name, format, size) before offsets are known
    let mut resolved: Vec<(u32, String, TextureFormat, u32)> = Vec::new();

    for input in inputs.iter().filter(|i| !is_builtin(i)) {
        let location = input.location.unwrap_or_default();
        match &input.ty {
            ReflectedType::Scalar { kind, bits } => {
                resolved.push(column(input, location, *kind, *bits, 1)?);
            }
            ReflectedType::Vector { kind, bits, components } => {
                resolved.push(column(input, location, *kind, *bits, *components)?);
            }
            ReflectedType::Matrix { kind, bits, columns, rows } => {
                if columns != rows {
                    return Err(crate::engine_fatal!(
                        SOURCE, @ShaderError,
                        "Vertex input '{}' is a non-square {}x{} matrix",
                        input.name, columns, rows
                    ));
                }
                if !(2..=4).contains(columns) {
                    return Err(crate::engine_fatal!(
                        SOURCE, @ShaderError,
                        "Vertex input '{}' has matrix dimension {}, expected 2, 3 or 4",
                        input.name, columns
                    ));
                }
                for c in 0..*columns {
                    let mut entry = column(input, location + c, *kind, *bits, *rows)?;
                    entry.1 = format!("{}[{}]", input.name, c);
                    resolved.push(entry);
                }
            }
            ReflectedType::Array { .. } => {
                return Err(crate::engine_fatal!(
                    SOURCE, @ShaderError,
                    "Vertex input '{}' mixes matrix and vector layouts (arrays are not supported)",
                    input.name
                ));
            }
            other => {
                return Err(crate::engine_fatal!(
                    SOURCE, @ShaderError,
                    "Vertex input '{}' has unsupported type {:?}",
                    input.name, other
                ));
            }
        }
    }

    resolved.sort_by_key(|(location, ..)| *location);

    if let Some(pair) = resolved.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(crate::engine_fatal!(
            SOURCE, @ShaderError,
            "Vertex inputs '{}' and '{}' overlap at location {}",
            pair[0].1, pair[1].1, pair[0].0
        ));
    }

    let mut offset = 0;
    let attributes = resolved
        .into_iter()
        .map(|(location, name, format, size)| {
            let attribute = VertexAttribute { name, location, format, offset, size };
            offset += size;
            attribute
        })
        .collect();

    Ok(VertexLayout { stride: offset, attributes })
}

fn column(
    input: &ReflectedVariable,
    location: u32,
    kind: ScalarKind,
    bits: u32,
    components: u32,
) -> Result<(u32, String, TextureFormat, u32)> {
    match attribute_format(kind, bits, components) {
        Some(format) => Ok((location, input.name.clone(), format, bits / 8 * components)),
        None => Err(crate::engine_fatal!(
            SOURCE, @ShaderError,
            "Vertex input '{}' has unsupported layout: {} x {:?}{}",
            input.name, components, kind, bits
        )),
    }
}

#[cfg(test)]
#[path = "vertex_layout_tests.rs"]
mod tests;
