/// Frame lifecycle bookkeeping
///
/// `FrameRing` tracks which in-flight frame is current, which frame fences
/// have a submission outstanding, and which frame last rendered to each
/// swapchain image. The Vulkan backend drives it from `begin_frame` and
/// `end_frame`.

use crate::error::{Error, Result};

/// Lifecycle state of one render frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Unset,
    FrameBegin,
    FrameEnd,
}

impl FrameState {
    pub fn begin(self) -> Result<FrameState> {
        match self {
            FrameState::Unset | FrameState::FrameEnd => Ok(FrameState::FrameBegin),
            FrameState::FrameBegin => Err(Error::ValidationError(
                "begin_frame called twice without end_frame".to_string(),
            )),
        }
    }

    pub fn end(self) -> Result<FrameState> {
        match self {
            FrameState::FrameBegin => Ok(FrameState::FrameEnd),
            other => Err(Error::ValidationError(format!(
                "end_frame called from state {:?}",
                other
            ))),
        }
    }
}

impl Default for FrameState {
    fn default() -> Self {
        FrameState::Unset
    }
}

/// Outcome class of an acquire or present call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    Optimal,
    Suboptimal,
    OutOfDate,
    /// Timeout or not-ready under a polling wait policy
    NotReady,
    DeviceLost,
}

/// What the frame loop does with a [`SurfaceStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    /// Render this frame
    Proceed,
    /// Mark the swapchain out of date and skip the frame
    Recreate,
    /// Skip the frame and retry next tick
    Skip,
    /// Unrecoverable, propagate `Error::DeviceLost`
    Fatal,
}

impl SurfaceStatus {
    pub fn action(self) -> FrameAction {
        match self {
            SurfaceStatus::Optimal => FrameAction::Proceed,
            SurfaceStatus::Suboptimal | SurfaceStatus::OutOfDate => FrameAction::Recreate,
            SurfaceStatus::NotReady => FrameAction::Skip,
            SurfaceStatus::DeviceLost => FrameAction::Fatal,
        }
    }
}

/// Round-robin frame index plus fence bookkeeping
#[derive(Debug, Clone)]
pub struct FrameRing {
    current: usize,
    fence_pending: Vec<bool>,
    images_in_flight: Vec<Option<usize>>,
}

impl FrameRing {
    pub fn new(frame_count: usize, image_count: usize) -> Self {
        Self {
            current: 0,
            fence_pending: vec![false; frame_count.max(1)],
            images_in_flight: vec![None; image_count],
        }
    }

    pub fn frame_count(&self) -> usize {
        self.fence_pending.len()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Move to the next frame, returning its index
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.frame_count();
        self.current
    }

    /// True if `frame` has a submission its fence has not been waited for
    pub fn fence_pending(&self, frame: usize) -> bool {
        self.fence_pending[frame]
    }

    /// Record that the fence of `frame` was waited on and is signaled
    pub fn fence_waited(&mut self, frame: usize) {
        self.fence_pending[frame] = false;
    }

    /// Record a submission signaling the fence of `frame`
    pub fn fence_submitted(&mut self, frame: usize) {
        self.fence_pending[frame] = true;
    }

    /// Frame whose outstanding fence guards `image`, if any
    pub fn image_guard(&self, image: usize) -> Option<usize> {
        self.images_in_flight
            .get(image)
            .copied()
            .flatten()
            .filter(|&frame| self.fence_pending[frame])
    }

    /// Record that `frame` now renders to `image`
    pub fn assign_image(&mut self, image: usize, frame: usize) {
        if image >= self.images_in_flight.len() {
            self.images_in_flight.resize(image + 1, None);
        }
        self.images_in_flight[image] = Some(frame);
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
