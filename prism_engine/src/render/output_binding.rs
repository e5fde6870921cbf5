/// Fragment output bindings derived from fragment-stage reflection

use crate::error::Result;
use crate::render::output::OutputMRT;
use crate::render::reflection::{ReflectedType, ReflectedVariable, ScalarKind};
use crate::render::types::TextureFormat;

const SOURCE: &str = "prism::shader";

/// Binding of one framebuffer slot to a fragment output location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputBinding {
    pub output: OutputMRT,
    pub location: u32,
    pub format: TextureFormat,
}

/// Attachment format matching a fragment output type
pub fn output_format(ty: &ReflectedType) -> Option<TextureFormat> {
    let (kind, bits, components) = match ty {
        ReflectedType::Scalar { kind, bits } => (*kind, *bits, 1),
        ReflectedType::Vector { kind, bits, components } => (*kind, *bits, *components),
        _ => return None,
    };
    if bits != 32 {
        return None;
    }
    let format = match (kind, components) {
        (ScalarKind::Float, 1) => TextureFormat::R32Sfloat,
        (ScalarKind::Float, 2) => TextureFormat::R32G32Sfloat,
        (ScalarKind::Float, 3 | 4) => TextureFormat::R32G32B32A32Sfloat,
        (ScalarKind::Uint, 1) => TextureFormat::R32Uint,
        (ScalarKind::Uint, 2) => TextureFormat::R32G32Uint,
        (ScalarKind::Uint, 3 | 4) => TextureFormat::R32G32B32A32Uint,
        (ScalarKind::Int, 1) => TextureFormat::R32Sint,
        (ScalarKind::Int, 2) => TextureFormat::R32G32Sint,
        (ScalarKind::Int, 3 | 4) => TextureFormat::R32G32B32A32Sint,
        _ => return None,
    };
    Some(format)
}

/// Derive output bindings from a fragment stage
///
/// Only outputs named `_outFBO<Tag>` are bound. Locations must run 0, 1, 2,
/// ... with no gap or repetition. One depth binding is appended at the next
/// location with `depth_format`.
pub fn derive_output_bindings(
    outputs: &[ReflectedVariable],
    depth_format: TextureFormat,
) -> Result<Vec<OutputBinding>> {
    let mut bindings = Vec::with_capacity(outputs.len() + 1);

    for variable in outputs {
        let output = match OutputMRT::from_output_name(&variable.name) {
            None => {
                crate::engine_warn!(
                    SOURCE,
                    "Fragment output '{}' has no _outFBO prefix and is not bound",
                    variable.name
                );
                continue;
            }
            Some(Err(tag)) => {
                return Err(crate::engine_fatal!(
                    SOURCE, @ShaderError,
                    "Fragment output '{}' names unknown slot '{}'",
                    variable.name, tag
                ));
            }
            Some(Ok(output)) => output,
        };

        if output.is_depth() {
            return Err(crate::engine_fatal!(
                SOURCE, @ShaderError,
                "Fragment output '{}' cannot target the depth slot, depth is bound implicitly",
                variable.name
            ));
        }
        let Some(location) = variable.location else {
            return Err(crate::engine_fatal!(
                SOURCE, @ShaderError,
                "Fragment output '{}' has no location",
                variable.name
            ));
        };
        let Some(format) = output_format(&variable.ty) else {
            return Err(crate::engine_fatal!(
                SOURCE, @ShaderError,
                "Fragment output '{}' has unsupported type {:?}",
                variable.name, variable.ty
            ));
        };
        if bindings.iter().any(|b: &OutputBinding| b.output == output) {
            return Err(crate::engine_fatal!(
                SOURCE, @ShaderError,
                "Slot {} is written by two fragment outputs",
                output
            ));
        }

        bindings.push(OutputBinding { output, location, format });
    }

    bindings.sort_by_key(|b| b.location);
    for (expected, binding) in bindings.iter().enumerate() {
        if binding.location != expected as u32 {
            return Err(crate::engine_fatal!(
                SOURCE, @ShaderError,
                "Fragment output {} is at location {}, expected {} (locations must be contiguous from 0)",
                binding.output, binding.location, expected
            ));
        }
    }

    bindings.push(OutputBinding {
        output: OutputMRT::DefaultDepth,
        location: bindings.len() as u32,
        format: depth_format,
    });

    Ok(bindings)
}

#[cfg(test)]
#[path = "output_binding_tests.rs"]
mod tests;
