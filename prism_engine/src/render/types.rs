/// Render vocabulary shared by the core and the backend
///
/// Plain value types only. The Vulkan backend converts them to `vk::*`
/// equivalents in one place.

// ===== MULTISAMPLE =====

/// Multisample count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SampleCount {
    S1,
    S2,
    S4,
    S8,
    S16,
    S32,
    S64,
}

impl SampleCount {
    pub const ALL: [SampleCount; 7] = [
        SampleCount::S1,
        SampleCount::S2,
        SampleCount::S4,
        SampleCount::S8,
        SampleCount::S16,
        SampleCount::S32,
        SampleCount::S64,
    ];

    /// Number of samples per pixel
    pub fn count(self) -> u32 {
        1 << (self as u32)
    }

    /// Exact match on a sample count, `None` for non powers of two or > 64
    pub fn from_count(count: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.count() == count)
    }

    /// Largest sample count that is `<= count` (at least S1)
    pub fn floor(count: u32) -> Self {
        Self::ALL
            .into_iter()
            .rev()
            .find(|s| s.count() <= count)
            .unwrap_or(SampleCount::S1)
    }

    pub fn is_multisampled(self) -> bool {
        self != SampleCount::S1
    }
}

impl Default for SampleCount {
    fn default() -> Self {
        SampleCount::S1
    }
}

// ===== INPUT ASSEMBLY / RASTERIZATION =====

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
    FrontAndBack,
}

/// Polygon rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    /// Fill polygons
    Fill,
    /// Draw edges only (wireframe)
    Line,
    /// Draw vertices only
    Point,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

// ===== DEPTH =====

/// Comparison operator for depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

impl Default for CompareOp {
    fn default() -> Self {
        CompareOp::Less
    }
}

// ===== COLOR BLEND =====

/// Blend factor for color blending equations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    SrcAlphaSaturate,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Blend equation of one color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFunction {
    pub enabled: bool,
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub color_op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub alpha_op: BlendOp,
}

impl BlendFunction {
    /// Blending disabled, the fragment overwrites the attachment
    pub const OPAQUE: Self = Self {
        enabled: false,
        src_color: BlendFactor::One,
        dst_color: BlendFactor::Zero,
        color_op: BlendOp::Add,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::Zero,
        alpha_op: BlendOp::Add,
    };

    /// Classic straight-alpha blending
    pub const ALPHA: Self = Self {
        enabled: true,
        src_color: BlendFactor::SrcAlpha,
        dst_color: BlendFactor::OneMinusSrcAlpha,
        color_op: BlendOp::Add,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::OneMinusSrcAlpha,
        alpha_op: BlendOp::Add,
    };

    /// Additive blending
    pub const ADDITIVE: Self = Self {
        enabled: true,
        src_color: BlendFactor::One,
        dst_color: BlendFactor::One,
        color_op: BlendOp::Add,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::One,
        alpha_op: BlendOp::Add,
    };
}

impl Default for BlendFunction {
    fn default() -> Self {
        Self::OPAQUE
    }
}

/// How per-attachment blend functions are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Every color attachment uses the pass-wide blend function
    Global,
    /// Every color attachment uses its own `OutputDescription` blend function
    Independent,
}

// ===== IMAGES =====

/// Image layouts the engine reasons about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    ColorAttachmentOptimal,
    DepthStencilAttachmentOptimal,
    ShaderReadOnlyOptimal,
    TransferSrcOptimal,
    TransferDstOptimal,
    PresentSrc,
}

/// Texel formats used by textures, attachments and vertex attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8G8B8A8Unorm,
    R8G8B8A8Srgb,
    B8G8R8A8Unorm,
    B8G8R8A8Srgb,
    R16G16B16A16Sfloat,
    R32Sfloat,
    R32G32Sfloat,
    R32G32B32Sfloat,
    R32G32B32A32Sfloat,
    R32Sint,
    R32G32Sint,
    R32G32B32Sint,
    R32G32B32A32Sint,
    R32Uint,
    R32G32Uint,
    R32G32B32Uint,
    R32G32B32A32Uint,
    D16Unorm,
    D32Sfloat,
    D24UnormS8Uint,
    D32SfloatS8Uint,
}

impl TextureFormat {
    /// True for depth (and depth/stencil) formats
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16Unorm
                | TextureFormat::D32Sfloat
                | TextureFormat::D24UnormS8Uint
                | TextureFormat::D32SfloatS8Uint
        )
    }

    /// True for formats carrying a stencil component
    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::D24UnormS8Uint | TextureFormat::D32SfloatS8Uint)
    }

    /// Size in bytes of one texel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8G8B8A8Unorm
            | TextureFormat::R8G8B8A8Srgb
            | TextureFormat::B8G8R8A8Unorm
            | TextureFormat::B8G8R8A8Srgb => 4,
            TextureFormat::R16G16B16A16Sfloat => 8,
            TextureFormat::R32Sfloat | TextureFormat::R32Sint | TextureFormat::R32Uint => 4,
            TextureFormat::R32G32Sfloat | TextureFormat::R32G32Sint | TextureFormat::R32G32Uint => 8,
            TextureFormat::R32G32B32Sfloat
            | TextureFormat::R32G32B32Sint
            | TextureFormat::R32G32B32Uint => 12,
            TextureFormat::R32G32B32A32Sfloat
            | TextureFormat::R32G32B32A32Sint
            | TextureFormat::R32G32B32A32Uint => 16,
            TextureFormat::D16Unorm => 2,
            TextureFormat::D32Sfloat | TextureFormat::D24UnormS8Uint => 4,
            TextureFormat::D32SfloatS8Uint => 8,
        }
    }
}

/// Role of an image; fixes its usage, tiling, aspect and layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    /// Sampled color texture loaded from pixels
    ColorSampled,
    /// Offscreen color attachment (also sampled, mip chain allowed)
    ColorAttachment,
    /// Depth attachment
    DepthAttachment,
    /// Image owned by the presentation engine
    Swapchain,
}

impl TextureType {
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureType::DepthAttachment)
    }

    /// Layout the image is left in once created
    pub fn initial_layout(&self) -> ImageLayout {
        match self {
            TextureType::ColorSampled => ImageLayout::ShaderReadOnlyOptimal,
            TextureType::ColorAttachment => ImageLayout::ShaderReadOnlyOptimal,
            TextureType::DepthAttachment => ImageLayout::Undefined,
            TextureType::Swapchain => ImageLayout::Undefined,
        }
    }
}

// ===== GEOMETRY / CLEAR =====

/// Image or surface size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Integer rectangle (render area, viewport sub-rectangle, scissor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a whole extent
    pub fn full(extent: Extent2D) -> Self {
        Self::new(0, 0, extent.width, extent.height)
    }

    /// Intersection with `extent` anchored at the origin
    pub fn clamp_to(&self, extent: Extent2D) -> Self {
        let x = self.x.clamp(0, extent.width as i32);
        let y = self.y.clamp(0, extent.height as i32);
        let max_w = extent.width - x as u32;
        let max_h = extent.height - y as u32;
        Self::new(x, y, self.width.min(max_w), self.height.min(max_h))
    }
}

/// Clear value of one attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

impl ClearValue {
    pub const BLACK: ClearValue = ClearValue::Color([0.0, 0.0, 0.0, 1.0]);
    pub const DEPTH_ONE: ClearValue = ClearValue::DepthStencil { depth: 1.0, stencil: 0 };
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
