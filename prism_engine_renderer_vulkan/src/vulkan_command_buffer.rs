/// CommandBuffer - one primary command buffer with an explicit recording state
///
/// Every recording call is checked against [`CommandState`]; an illegal
/// transition is a fatal validation error and leaves the buffer untouched.

use ash::vk;
use prism_engine::prism::render::{CommandOp, CommandState};
use prism_engine::prism::Result;
use prism_engine::{engine_fatal, engine_warn};
use std::sync::Arc;

use crate::vulkan_device::{map_vk_result, Device};

const SOURCE: &str = "prism::vulkan";

/// Synchronization attached to a submission
#[derive(Debug, Default, Clone, Copy)]
pub struct SubmitSync<'a> {
    /// Semaphores waited on, with the stage each one gates
    pub wait: &'a [(vk::Semaphore, vk::PipelineStageFlags)],
    pub signal: &'a [vk::Semaphore],
    pub fence: Option<vk::Fence>,
    /// Block until the queue is idle after submitting
    pub wait_idle: bool,
}

impl SubmitSync<'_> {
    fn is_unsynchronized(&self) -> bool {
        self.wait.is_empty() && self.signal.is_empty() && self.fence.is_none() && !self.wait_idle
    }
}

pub struct CommandBuffer {
    device: Arc<Device>,
    command_buffer: vk::CommandBuffer,
    state: CommandState,
}

impl CommandBuffer {
    /// Allocate a primary command buffer from the device pool
    pub fn new(device: &Arc<Device>) -> Result<Self> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(device.command_pool())
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = unsafe {
            device
                .raw()
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| map_vk_result(e, "allocate command buffer"))?[0]
        };

        Ok(Self {
            device: Arc::clone(device),
            command_buffer,
            state: CommandState::Unset,
        })
    }

    pub fn handle(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    pub fn in_pass(&self) -> bool {
        self.state.in_pass()
    }

    fn transition(&mut self, op: CommandOp) -> Result<CommandState> {
        let state = self.state;
        state.apply(op).map_err(|_| {
            engine_fatal!(
                SOURCE, @ValidationError,
                "Illegal command buffer transition {:?} from state {:?}",
                op, state
            )
        })
    }

    /// Start recording (implicitly resets the previous contents)
    pub fn begin(&mut self) -> Result<()> {
        let next = self.transition(CommandOp::Begin)?;
        let begin_info =
            vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.device
                .raw()
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| map_vk_result(e, "begin command buffer"))?;
        }
        self.state = next;
        Ok(())
    }

    pub fn begin_pass(&mut self, info: &vk::RenderPassBeginInfo) -> Result<()> {
        let next = self.transition(CommandOp::BeginPass)?;
        unsafe {
            self.device
                .raw()
                .cmd_begin_render_pass(self.command_buffer, info, vk::SubpassContents::INLINE);
        }
        self.state = next;
        Ok(())
    }

    pub fn end_pass(&mut self) -> Result<()> {
        let next = self.transition(CommandOp::EndPass)?;
        unsafe {
            self.device.raw().cmd_end_render_pass(self.command_buffer);
        }
        self.state = next;
        Ok(())
    }

    pub fn end(&mut self) -> Result<()> {
        let next = self.transition(CommandOp::End)?;
        unsafe {
            self.device
                .raw()
                .end_command_buffer(self.command_buffer)
                .map_err(|e| map_vk_result(e, "end command buffer"))?;
        }
        self.state = next;
        Ok(())
    }

    /// Submit to the graphics queue
    ///
    /// Without any semaphore, fence or idle wait the completion order is
    /// undefined, which is reported as a warning.
    pub fn submit(&mut self, sync: &SubmitSync<'_>) -> Result<()> {
        let next = self.transition(CommandOp::Submit)?;
        if sync.is_unsynchronized() {
            engine_warn!(SOURCE, "Command buffer submitted without semaphore, fence or idle wait");
        }

        let wait_semaphores: Vec<vk::Semaphore> = sync.wait.iter().map(|(s, _)| *s).collect();
        let wait_stages: Vec<vk::PipelineStageFlags> = sync.wait.iter().map(|(_, st)| *st).collect();
        let command_buffers = [self.command_buffer];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(sync.signal);

        let queue = self.device.graphics_queue();
        unsafe {
            self.device
                .raw()
                .queue_submit(queue, &[submit_info], sync.fence.unwrap_or(vk::Fence::null()))
                .map_err(|e| map_vk_result(e, "submit command buffer"))?;
            self.state = next;

            if sync.wait_idle {
                self.device
                    .raw()
                    .queue_wait_idle(queue)
                    .map_err(|e| map_vk_result(e, "wait for queue idle"))?;
            }
        }
        Ok(())
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        if !self.state.safe_to_destroy() {
            engine_warn!(SOURCE, "Command buffer destroyed in state {:?}, recorded work is lost", self.state);
        }
        unsafe {
            self.device
                .raw()
                .free_command_buffers(self.device.command_pool(), &[self.command_buffer]);
        }
    }
}
