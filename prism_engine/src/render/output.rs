/// Semantic output slots of a render pass
///
/// Fragment outputs are bound to slots by name: a variable called
/// `_outFBO<Tag>` writes to the slot whose tag is `<Tag>`.

use std::fmt;

/// Name prefix of fragment outputs that target a framebuffer slot
pub const OUTPUT_PREFIX: &str = "_outFBO";

/// Logical output slot of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputMRT {
    /// Presented color (the swapchain image)
    DefaultColor,
    /// Depth buffer of the frame
    DefaultDepth,
    DfPosition,
    DfColor,
    DfDepthPlane,
    DfNormal,
    DfPick,
    /// User slot `Custom0` .. `Custom9`
    Custom(u8),
}

impl OutputMRT {
    /// Highest custom slot index
    pub const MAX_CUSTOM: u8 = 9;

    /// Parse a tag such as `DefaultColor`, `DF_Normal` or `Custom3`
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "DefaultColor" => Some(OutputMRT::DefaultColor),
            "DefaultDepth" => Some(OutputMRT::DefaultDepth),
            "DF_Position" => Some(OutputMRT::DfPosition),
            "DF_Color" => Some(OutputMRT::DfColor),
            "DF_Depth_Plane" => Some(OutputMRT::DfDepthPlane),
            "DF_Normal" => Some(OutputMRT::DfNormal),
            "DF_Pick" => Some(OutputMRT::DfPick),
            _ => {
                let index: u8 = tag.strip_prefix("Custom")?.parse().ok()?;
                (index <= Self::MAX_CUSTOM && tag.len() == "Custom".len() + 1)
                    .then_some(OutputMRT::Custom(index))
            }
        }
    }

    /// Parse a full fragment output name (`_outFBODF_Normal`)
    ///
    /// Returns `None` when the name does not carry the output prefix, and
    /// `Some(Err(tag))` when the prefix is present but the tag is unknown.
    pub fn from_output_name(name: &str) -> Option<Result<Self, &str>> {
        let tag = name.strip_prefix(OUTPUT_PREFIX)?;
        Some(Self::from_tag(tag).ok_or(tag))
    }

    /// Tag as written in shader output names
    pub fn tag(&self) -> String {
        match self {
            OutputMRT::DefaultColor => "DefaultColor".to_string(),
            OutputMRT::DefaultDepth => "DefaultDepth".to_string(),
            OutputMRT::DfPosition => "DF_Position".to_string(),
            OutputMRT::DfColor => "DF_Color".to_string(),
            OutputMRT::DfDepthPlane => "DF_Depth_Plane".to_string(),
            OutputMRT::DfNormal => "DF_Normal".to_string(),
            OutputMRT::DfPick => "DF_Pick".to_string(),
            OutputMRT::Custom(i) => format!("Custom{}", i),
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(self, OutputMRT::DefaultDepth)
    }

    pub fn is_color(&self) -> bool {
        !self.is_depth()
    }
}

impl fmt::Display for OutputMRT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
