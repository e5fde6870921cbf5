/// Shader reflection data model
///
/// Backend-neutral description of what a compiled shader stage declares.
/// The Vulkan backend fills it from SPIR-V; layout derivation works on it.

use bitflags::bitflags;

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
}

impl ShaderStage {
    pub fn flag(self) -> ShaderStageFlags {
        match self {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::TessellationControl => ShaderStageFlags::TESSELLATION_CONTROL,
            ShaderStage::TessellationEvaluation => ShaderStageFlags::TESSELLATION_EVALUATION,
            ShaderStage::Geometry => ShaderStageFlags::GEOMETRY,
            ShaderStage::Fragment => ShaderStageFlags::FRAGMENT,
        }
    }

    /// Parse an execution model name (`"Vertex"`, `"Fragment"`, ...)
    pub fn from_execution_model(name: &str) -> Option<Self> {
        match name {
            "Vertex" => Some(ShaderStage::Vertex),
            "TessellationControl" => Some(ShaderStage::TessellationControl),
            "TessellationEvaluation" => Some(ShaderStage::TessellationEvaluation),
            "Geometry" => Some(ShaderStage::Geometry),
            "Fragment" => Some(ShaderStage::Fragment),
            _ => None,
        }
    }
}

bitflags! {
    /// Set of shader stages
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const TESSELLATION_CONTROL = 1 << 1;
        const TESSELLATION_EVALUATION = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
    }
}

/// Scalar component kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Float,
    Int,
    Uint,
    Bool,
}

/// Reflected type of an interface variable or resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectedType {
    Scalar { kind: ScalarKind, bits: u32 },
    Vector { kind: ScalarKind, bits: u32, components: u32 },
    /// `columns` column vectors of `rows` components each
    Matrix { kind: ScalarKind, bits: u32, columns: u32, rows: u32 },
    Array { element: Box<ReflectedType>, count: Option<u32> },
    Struct { size: Option<u32> },
    Image,
    Sampler,
    SampledImage,
    Other(String),
}

impl ReflectedType {
    /// Byte size for fixed-size numeric types
    pub fn byte_size(&self) -> Option<u32> {
        match self {
            ReflectedType::Scalar { bits, .. } => Some(bits / 8),
            ReflectedType::Vector { bits, components, .. } => Some(bits / 8 * components),
            ReflectedType::Matrix { bits, columns, rows, .. } => Some(bits / 8 * columns * rows),
            ReflectedType::Array { element, count } => Some(element.byte_size()? * (*count)?),
            ReflectedType::Struct { size } => *size,
            _ => None,
        }
    }
}

/// Stage input or output variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedVariable {
    pub name: String,
    /// `None` for built-ins that carry no location
    pub location: Option<u32>,
    pub ty: ReflectedType,
}

/// Descriptor resource classification reported by reflection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorKind {
    UniformBuffer,
    CombinedImageSampler,
    SampledImage,
    Sampler,
    StorageBuffer,
    Other(String),
}

/// One descriptor binding declared by a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedDescriptor {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub kind: DescriptorKind,
    /// Array element count (1 for non-arrays)
    pub count: u32,
    /// Declared block size in bytes (uniform buffers)
    pub size: Option<u32>,
}

/// Reflection of one shader stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderReflection {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub inputs: Vec<ReflectedVariable>,
    pub outputs: Vec<ReflectedVariable>,
    pub descriptors: Vec<ReflectedDescriptor>,
    /// Push constant block size in bytes, if any
    pub push_constant_size: Option<u32>,
}

impl ShaderReflection {
    /// Empty reflection for `stage` with entry point `main`
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            entry_point: "main".to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            descriptors: Vec::new(),
            push_constant_size: None,
        }
    }
}

#[cfg(test)]
#[path = "reflection_tests.rs"]
mod tests;
