/// Mip chain planning
///
/// The backend records one blit per step, downsampling level `L - 1` into
/// level `L` at half resolution (never below 1 pixel).

use crate::render::types::Extent2D;

/// Number of mip levels for a full chain: floor(log2(max(w, h))) + 1
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    32 - largest.leading_zeros()
}

/// One downsampling step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipBlit {
    pub src_level: u32,
    pub dst_level: u32,
    pub src_extent: Extent2D,
    pub dst_extent: Extent2D,
}

/// Blits generating levels `1..levels` from level 0
pub fn plan_mip_chain(extent: Extent2D, levels: u32) -> Vec<MipBlit> {
    let mut blits = Vec::with_capacity(levels.saturating_sub(1) as usize);
    let mut src = extent;
    for level in 1..levels {
        let dst = Extent2D::new((src.width / 2).max(1), (src.height / 2).max(1));
        blits.push(MipBlit {
            src_level: level - 1,
            dst_level: level,
            src_extent: src,
            dst_extent: dst,
        });
        src = dst;
    }
    blits
}
