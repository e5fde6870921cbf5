/// ShaderModule - one SPIR-V stage plus the reflection that drives layouts
///
/// Reflection is the only source for vertex input, fragment output and
/// descriptor layouts: nothing is declared by hand.

use ash::vk;
use prism_engine::prism::render::{
    DescriptorKind, ReflectedDescriptor, ReflectedType, ReflectedVariable, ScalarKind, ShaderReflection,
    ShaderStage,
};
use prism_engine::prism::Result;
use prism_engine::{engine_debug, engine_err, engine_fatal};
use std::ffi::CString;
use std::path::Path;
use std::sync::Arc;

use crate::vulkan_device::Device;

const SOURCE: &str = "prism::shader";

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Decode a little-endian SPIR-V byte stream into words
pub fn spirv_words(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(engine_fatal!(
            SOURCE, @ShaderError,
            "SPIR-V binary of {} bytes is not a whole number of words",
            bytes.len()
        ));
    }
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if words[0] != SPIRV_MAGIC {
        return Err(engine_fatal!(
            SOURCE, @ShaderError,
            "Bad SPIR-V magic number {:#010x}",
            words[0]
        ));
    }
    Ok(words)
}

fn scalar_kind(scalar: &spirq::ty::ScalarType) -> (ScalarKind, u32) {
    use spirq::ty::ScalarType;
    match scalar {
        ScalarType::Float { bits } => (ScalarKind::Float, *bits as u32),
        ScalarType::Integer { bits, is_signed: true } => (ScalarKind::Int, *bits as u32),
        ScalarType::Integer { bits, is_signed: false } => (ScalarKind::Uint, *bits as u32),
        ScalarType::Boolean => (ScalarKind::Bool, 32),
        ScalarType::Void => (ScalarKind::Float, 0),
    }
}

fn reflected_type(ty: &spirq::ty::Type) -> ReflectedType {
    use spirq::ty::Type;
    match ty {
        Type::Scalar(s) => {
            let (kind, bits) = scalar_kind(s);
            ReflectedType::Scalar { kind, bits }
        }
        Type::Vector(v) => {
            let (kind, bits) = scalar_kind(&v.scalar_ty);
            ReflectedType::Vector { kind, bits, components: v.nscalar as u32 }
        }
        Type::Matrix(m) => {
            let (kind, bits) = scalar_kind(&m.vector_ty.scalar_ty);
            ReflectedType::Matrix {
                kind,
                bits,
                columns: m.nvector as u32,
                rows: m.vector_ty.nscalar as u32,
            }
        }
        Type::Array(a) => ReflectedType::Array {
            element: Box::new(reflected_type(&a.element_ty)),
            count: a.nelement.map(|n| n as u32),
        },
        Type::Struct(_) => ReflectedType::Struct { size: ty.nbyte().map(|s| s as u32) },
        other => ReflectedType::Other(format!("{:?}", other)),
    }
}

fn descriptor_kind(desc_ty: &spirq::ty::DescriptorType) -> DescriptorKind {
    use spirq::ty::DescriptorType;
    match desc_ty {
        DescriptorType::UniformBuffer() => DescriptorKind::UniformBuffer,
        DescriptorType::CombinedImageSampler() => DescriptorKind::CombinedImageSampler,
        DescriptorType::SampledImage() => DescriptorKind::SampledImage,
        DescriptorType::Sampler() => DescriptorKind::Sampler,
        DescriptorType::StorageBuffer(..) => DescriptorKind::StorageBuffer,
        other => DescriptorKind::Other(format!("{:?}", other)),
    }
}

/// Reflect the `main` entry point of a SPIR-V module
pub fn reflect_spirv(words: &[u32]) -> Result<ShaderReflection> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(words)
        .ref_all_rscs(true)
        .combine_img_samplers(true)
        .reflect()
        .map_err(|e| engine_fatal!(SOURCE, @ShaderError, "SPIR-V reflection failed: {:?}", e))?;

    let entry = entry_points
        .iter()
        .find(|ep| ep.name == "main")
        .or_else(|| entry_points.first())
        .ok_or_else(|| engine_fatal!(SOURCE, @ShaderError, "SPIR-V module has no entry point"))?;

    let model = format!("{:?}", entry.exec_model);
    let stage = ShaderStage::from_execution_model(&model).ok_or_else(|| {
        engine_fatal!(SOURCE, @ShaderError, "Unsupported execution model {}", model)
    })?;

    let mut reflection = ShaderReflection::new(stage);
    reflection.entry_point = entry.name.clone();

    for var in entry.vars.iter() {
        match var {
            spirq::var::Variable::Input { name, location, ty, .. } => {
                reflection.inputs.push(ReflectedVariable {
                    name: name.clone().unwrap_or_default(),
                    location: Some(location.loc()),
                    ty: reflected_type(ty),
                });
            }
            spirq::var::Variable::Output { name, location, ty, .. } => {
                reflection.outputs.push(ReflectedVariable {
                    name: name.clone().unwrap_or_default(),
                    location: Some(location.loc()),
                    ty: reflected_type(ty),
                });
            }
            spirq::var::Variable::Descriptor { name, desc_bind, desc_ty, ty, nbind, .. } => {
                reflection.descriptors.push(ReflectedDescriptor {
                    name: name.clone().unwrap_or_default(),
                    set: desc_bind.set(),
                    binding: desc_bind.bind(),
                    kind: descriptor_kind(desc_ty),
                    count: (*nbind).max(1),
                    size: ty.nbyte().map(|s| s as u32),
                });
            }
            spirq::var::Variable::PushConstant { ty, .. } => {
                reflection.push_constant_size = ty.nbyte().map(|s| s as u32);
            }
            _ => {}
        }
    }

    reflection.inputs.sort_by_key(|v| v.location);
    reflection.outputs.sort_by_key(|v| v.location);
    reflection.descriptors.sort_by_key(|d| (d.set, d.binding));
    Ok(reflection)
}

pub struct ShaderModule {
    device: Arc<Device>,
    module: vk::ShaderModule,
    entry_point: CString,
    reflection: ShaderReflection,
}

impl ShaderModule {
    /// Reflect and create a module from SPIR-V bytes
    pub fn new(device: &Arc<Device>, bytes: &[u8]) -> Result<Self> {
        let words = spirv_words(bytes)?;
        let reflection = reflect_spirv(&words)?;
        let entry_point = CString::new(reflection.entry_point.as_str())
            .map_err(|e| engine_fatal!(SOURCE, @ShaderError, "Invalid entry point name: {}", e))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&words);
        let module = unsafe {
            device
                .raw()
                .create_shader_module(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create shader module: {:?}", e))?
        };

        engine_debug!(
            SOURCE,
            "{:?} shader: {} inputs, {} outputs, {} descriptors",
            reflection.stage,
            reflection.inputs.len(),
            reflection.outputs.len(),
            reflection.descriptors.len()
        );

        Ok(Self {
            device: Arc::clone(device),
            module,
            entry_point,
            reflection,
        })
    }

    /// Load a compiled `.spv` file
    pub fn from_file(device: &Arc<Device>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            engine_fatal!(SOURCE, @ShaderError, "Failed to read shader '{}': {}", path.display(), e)
        })?;
        Self::new(device, &bytes)
    }

    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    pub fn stage(&self) -> ShaderStage {
        self.reflection.stage
    }

    pub fn entry_point(&self) -> &CString {
        &self.entry_point
    }

    pub fn reflection(&self) -> &ShaderReflection {
        &self.reflection
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.raw().destroy_shader_module(self.module, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_shader_module_tests.rs"]
mod tests;
