//! Unit tests for frame.rs
//!
//! The frame loop is simulated the way the backend drives the ring.

use crate::render::frame::*;

/// Mirrors `begin_frame`/`end_frame`, counting fence waits per frame
struct Simulation {
    ring: FrameRing,
    waits: Vec<u32>,
    submits: Vec<u32>,
    bound: Vec<usize>,
}

impl Simulation {
    fn new(frames: usize, images: usize) -> Self {
        Self {
            ring: FrameRing::new(frames, images),
            waits: vec![0; frames],
            submits: vec![0; frames],
            bound: Vec::new(),
        }
    }

    fn wait(&mut self, frame: usize) {
        // A fence is never waited twice without a submit in between
        assert!(self.waits[frame] < self.submits[frame]);
        self.waits[frame] += 1;
        self.ring.fence_waited(frame);
    }

    fn cycle(&mut self, image: usize) {
        let frame = self.ring.current();
        if self.ring.fence_pending(frame) {
            self.wait(frame);
        }
        if let Some(guard) = self.ring.image_guard(image) {
            self.wait(guard);
        }
        self.ring.assign_image(image, frame);
        self.bound.push(frame);

        self.submits[frame] += 1;
        self.ring.fence_submitted(frame);
        self.ring.advance();
    }
}

#[test]
fn test_round_robin_two_frames() {
    let mut sim = Simulation::new(2, 2);
    for i in 0..10 {
        sim.cycle(i % 2);
    }
    assert_eq!(sim.bound, vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 1]);
}

#[test]
fn test_round_robin_three_frames() {
    let mut sim = Simulation::new(3, 3);
    for i in 0..7 {
        sim.cycle(i % 3);
    }
    assert_eq!(sim.bound, vec![0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn test_out_of_order_images_wait_on_guarding_frame() {
    let mut sim = Simulation::new(2, 3);
    // Presentation engine hands images back out of order
    for image in [0, 1, 1, 0, 2, 2, 1, 0] {
        sim.cycle(image);
    }
    assert_eq!(sim.bound.len(), 8);
    assert!(sim.waits.iter().zip(&sim.submits).all(|(w, s)| w <= s));
}

#[test]
fn test_image_guard_ignores_signaled_fences() {
    let mut ring = FrameRing::new(2, 2);
    ring.assign_image(0, 1);
    assert_eq!(ring.image_guard(0), None);
    ring.fence_submitted(1);
    assert_eq!(ring.image_guard(0), Some(1));
    ring.fence_waited(1);
    assert_eq!(ring.image_guard(0), None);
    assert_eq!(ring.image_guard(5), None);
}

#[test]
fn test_frame_state_transitions() {
    let state = FrameState::default().begin().unwrap();
    assert!(state.begin().is_err());
    let state = state.end().unwrap();
    assert!(state.end().is_err());
    assert_eq!(state.begin().unwrap(), FrameState::FrameBegin);
    assert!(FrameState::Unset.end().is_err());
}

#[test]
fn test_surface_status_actions() {
    assert_eq!(SurfaceStatus::Optimal.action(), FrameAction::Proceed);
    assert_eq!(SurfaceStatus::Suboptimal.action(), FrameAction::Recreate);
    assert_eq!(SurfaceStatus::OutOfDate.action(), FrameAction::Recreate);
    assert_eq!(SurfaceStatus::NotReady.action(), FrameAction::Skip);
    assert_eq!(SurfaceStatus::DeviceLost.action(), FrameAction::Fatal);
}
