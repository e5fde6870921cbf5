/// Descriptor table - the flat, name-keyed map of a shader's resource bindings
///
/// Built once when a pipeline shader is created. Binding indices and names
/// are unique across every stage of the shader.

use rustc_hash::{FxHashMap, FxHashSet};
use crate::error::Result;
use crate::render::reflection::{DescriptorKind, ShaderReflection, ShaderStageFlags};

const SOURCE: &str = "prism::shader";

/// Descriptor types the engine binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// Uniform buffer object
    Ubo,
    /// Combined image sampler
    Sampler,
}

/// Intended use of a uniform block, guessed from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UboRole {
    ViewProj,
    InstanceData,
    Lights,
    Other,
}

impl UboRole {
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("_uboViewProj") {
            UboRole::ViewProj
        } else if name.starts_with("_uboInstanceData") {
            UboRole::InstanceData
        } else if name.starts_with("_uboLights") {
            UboRole::Lights
        } else {
            UboRole::Other
        }
    }
}

/// One named resource binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub binding: u32,
    pub ty: DescriptorType,
    pub array_size: u32,
    /// Declared block size in bytes (UBOs)
    pub size: Option<u32>,
    pub stages: ShaderStageFlags,
    pub role: UboRole,
}

/// Descriptor pool sizing for `frames` descriptor sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSizes {
    pub ubos: u32,
    pub samplers: u32,
    pub sets: u32,
}

/// All descriptors of a pipeline shader
#[derive(Debug, Clone, Default)]
pub struct DescriptorTable {
    by_name: FxHashMap<String, Descriptor>,
}

impl DescriptorTable {
    /// Collect and validate the descriptors of every stage
    pub fn build<'a, I>(stages: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ShaderReflection>,
    {
        let mut by_name: FxHashMap<String, Descriptor> = FxHashMap::default();
        let mut by_binding: FxHashMap<u32, String> = FxHashMap::default();

        for stage in stages {
            for reflected in &stage.descriptors {
                let ty = match &reflected.kind {
                    DescriptorKind::UniformBuffer => DescriptorType::Ubo,
                    DescriptorKind::CombinedImageSampler => DescriptorType::Sampler,
                    other => {
                        return Err(crate::engine_fatal!(
                            SOURCE, @ShaderError,
                            "Descriptor '{}' has unsupported type {:?}",
                            reflected.name, other
                        ));
                    }
                };

                if reflected.set != 0 {
                    return Err(crate::engine_fatal!(
                        SOURCE, @ShaderError,
                        "Descriptor '{}' uses set {}, only set 0 is supported",
                        reflected.name, reflected.set
                    ));
                }
                if ty == DescriptorType::Ubo && reflected.count > 1 {
                    return Err(crate::engine_fatal!(
                        SOURCE, @ShaderError,
                        "Uniform block '{}' is an array of {}, UBO arrays are not supported",
                        reflected.name, reflected.count
                    ));
                }
                if let Some(existing) = by_binding.get(&reflected.binding) {
                    return Err(crate::engine_fatal!(
                        SOURCE, @ShaderError,
                        "Binding {} is used by both '{}' and '{}'",
                        reflected.binding, existing, reflected.name
                    ));
                }
                if by_name.contains_key(&reflected.name) {
                    return Err(crate::engine_fatal!(
                        SOURCE, @ShaderError,
                        "Descriptor name '{}' is declared twice",
                        reflected.name
                    ));
                }

                by_binding.insert(reflected.binding, reflected.name.clone());
                by_name.insert(
                    reflected.name.clone(),
                    Descriptor {
                        name: reflected.name.clone(),
                        binding: reflected.binding,
                        ty,
                        array_size: reflected.count.max(1),
                        size: reflected.size,
                        stages: stage.stage.flag(),
                        role: UboRole::from_name(&reflected.name),
                    },
                );
            }
        }

        Ok(Self { by_name })
    }

    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Descriptors sorted by binding index
    pub fn sorted(&self) -> Vec<&Descriptor> {
        let mut list: Vec<_> = self.by_name.values().collect();
        list.sort_by_key(|d| d.binding);
        list
    }

    pub fn count(&self, ty: DescriptorType) -> u32 {
        self.by_name
            .values()
            .filter(|d| d.ty == ty)
            .map(|d| d.array_size)
            .sum()
    }

    /// Pool sizes for one descriptor set per frame in flight
    pub fn pool_sizes(&self, frames: u32) -> PoolSizes {
        PoolSizes {
            ubos: self.count(DescriptorType::Ubo) * frames,
            samplers: self.count(DescriptorType::Sampler) * frames,
            sets: frames,
        }
    }

    /// Check a UBO creation request against the shader declaration
    ///
    /// `created` holds the shader variables that already have a buffer.
    pub fn check_ubo_request(
        &self,
        shader_var: &str,
        byte_size: u64,
        created: &FxHashSet<String>,
    ) -> Result<&Descriptor> {
        let Some(descriptor) = self.get(shader_var) else {
            crate::engine_bail_warn!(
                SOURCE, @InvalidResource,
                "Shader declares no descriptor named '{}'",
                shader_var
            );
        };
        if descriptor.ty != DescriptorType::Ubo {
            crate::engine_bail_warn!(SOURCE, @InvalidResource, "Descriptor '{}' is not a uniform block", shader_var);
        }
        if created.contains(shader_var) {
            crate::engine_bail_warn!(SOURCE, @InvalidResource, "UBO for '{}' already created", shader_var);
        }
        if let Some(declared) = descriptor.size {
            if byte_size > declared as u64 {
                crate::engine_bail_warn!(
                    SOURCE, @InvalidResource,
                    "UBO for '{}' requests {} bytes, the shader block holds {}",
                    shader_var, byte_size, declared
                );
            }
        }
        Ok(descriptor)
    }
}

/// Tracks which descriptors were bound during the current pass
#[derive(Debug, Default)]
pub struct BindingTracker {
    bound: FxHashSet<String>,
    warned: FxHashSet<String>,
}

impl BindingTracker {
    pub fn mark_bound(&mut self, name: &str) {
        self.bound.insert(name.to_string());
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bound.contains(name)
    }

    /// Names of descriptors used by a draw but never bound, each reported once
    pub fn report_unbound(&mut self, table: &DescriptorTable) -> Vec<String> {
        let mut missing: Vec<String> = table
            .by_name
            .keys()
            .filter(|name| !self.bound.contains(*name) && !self.warned.contains(*name))
            .cloned()
            .collect();
        missing.sort();
        for name in &missing {
            crate::engine_warn!(SOURCE, "Descriptor '{}' used by the pipeline was never bound", name);
            self.warned.insert(name.clone());
        }
        missing
    }

    /// Forget bindings at the end of a pass
    pub fn reset(&mut self) {
        self.bound.clear();
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
