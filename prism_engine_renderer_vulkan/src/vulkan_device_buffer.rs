/// DeviceBuffer - one `vk::Buffer` with its memory block
///
/// `item_size * item_count` bytes, either host-visible (mapped, copyable
/// from the CPU) or device-local (reachable only through transfer commands).

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use prism_engine::prism::{Error, Result};
use prism_engine::{engine_bail, engine_err};
use std::sync::Arc;

use crate::vulkan_device::Device;

const SOURCE: &str = "prism::vulkan";

pub struct DeviceBuffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    item_size: u64,
    item_count: u64,
    host_visible: bool,
}

impl DeviceBuffer {
    pub fn new(
        device: &Arc<Device>,
        usage: vk::BufferUsageFlags,
        item_size: u64,
        item_count: u64,
        host_visible: bool,
    ) -> Result<Self> {
        let size = item_size * item_count;
        if size == 0 {
            engine_bail!(SOURCE, @InvalidResource, "Buffer of {} x {} bytes is empty", item_count, item_size);
        }

        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device
                .raw()
                .create_buffer(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create buffer of {} bytes: {:?}", size, e))?;

            let requirements = device.raw().get_buffer_memory_requirements(buffer);
            let location = if host_visible {
                MemoryLocation::CpuToGpu
            } else {
                MemoryLocation::GpuOnly
            };

            let allocation = match device.allocate("buffer", requirements, location, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.raw().destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = device
                .raw()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            {
                device.free(allocation);
                device.raw().destroy_buffer(buffer, None);
                engine_bail!(SOURCE, "Failed to bind buffer memory: {:?}", e);
            }

            Ok(Self {
                device: Arc::clone(device),
                buffer,
                allocation: Some(allocation),
                item_size,
                item_count,
                host_visible,
            })
        }
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn item_size(&self) -> u64 {
        self.item_size
    }

    pub fn item_count(&self) -> u64 {
        self.item_count
    }

    /// Total size in bytes
    pub fn size(&self) -> u64 {
        self.item_size * self.item_count
    }

    pub fn is_host_visible(&self) -> bool {
        self.host_visible
    }

    fn mapped(&self) -> Result<*mut u8> {
        if !self.host_visible {
            engine_bail!(SOURCE, @ValidationError, "Device-local buffer cannot be mapped for CPU access");
        }
        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| engine_err!(SOURCE, "Buffer has no allocation"))?;
        let ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?;
        Ok(ptr.as_ptr() as *mut u8)
    }

    /// Copy `data` into the mapped memory at byte `offset`
    pub fn copy_from_host(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.size() {
            engine_bail!(
                SOURCE, @InvalidResource,
                "Write of {} bytes at offset {} overflows a {} byte buffer",
                data.len(), offset, self.size()
            );
        }
        let mapped = self.mapped()?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.add(offset as usize), data.len());
        }
        Ok(())
    }

    /// Read the whole mapped memory back
    pub fn read_to_host(&self) -> Result<Vec<u8>> {
        let mapped = self.mapped()?;
        let mut data = vec![0u8; self.size() as usize];
        unsafe {
            std::ptr::copy_nonoverlapping(mapped as *const u8, data.as_mut_ptr(), data.len());
        }
        Ok(data)
    }

    /// Record a full-size copy from `self` into `dst`
    pub fn record_copy_to(&self, cb: vk::CommandBuffer, dst: &DeviceBuffer) {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: self.size().min(dst.size()),
        };
        unsafe {
            self.device
                .raw()
                .cmd_copy_buffer(cb, self.buffer, dst.buffer, &[region]);
        }
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.device.free(allocation);
        }
        unsafe {
            self.device.raw().destroy_buffer(self.buffer, None);
        }
    }
}
