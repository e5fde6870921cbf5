/// Buffer - vertex, index or uniform data, optionally staged to device memory
///
/// A host-visible buffer is always created. With staging, a device-local
/// twin receives the data through a one-time transfer and the host buffer is
/// released afterwards, which makes staged buffers write-once.

use ash::vk;
use prism_engine::prism::Result;
use prism_engine::{engine_bail, engine_debug};
use std::sync::Arc;

use crate::vulkan_device::Device;
use crate::vulkan_device_buffer::DeviceBuffer;

const SOURCE: &str = "prism::vulkan";

/// What a buffer is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

impl BufferUsage {
    fn to_vk(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        }
    }
}

pub struct Buffer {
    device: Arc<Device>,
    usage: BufferUsage,
    item_size: u64,
    item_count: u64,
    host: Option<DeviceBuffer>,
    gpu: Option<DeviceBuffer>,
}

impl Buffer {
    /// Create a buffer of `item_count` items of `item_size` bytes
    pub fn new(
        device: &Arc<Device>,
        usage: BufferUsage,
        item_size: u64,
        item_count: u64,
        staged: bool,
    ) -> Result<Self> {
        let host_usage = if staged {
            vk::BufferUsageFlags::TRANSFER_SRC
        } else {
            usage.to_vk()
        };
        let host = DeviceBuffer::new(device, host_usage, item_size, item_count, true)?;

        let gpu = if staged {
            Some(DeviceBuffer::new(
                device,
                usage.to_vk() | vk::BufferUsageFlags::TRANSFER_DST | vk::BufferUsageFlags::TRANSFER_SRC,
                item_size,
                item_count,
                false,
            )?)
        } else {
            None
        };

        Ok(Self {
            device: Arc::clone(device),
            usage,
            item_size,
            item_count,
            host: Some(host),
            gpu,
        })
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn item_size(&self) -> u64 {
        self.item_size
    }

    pub fn item_count(&self) -> u64 {
        self.item_count
    }

    pub fn size(&self) -> u64 {
        self.item_size * self.item_count
    }

    pub fn is_staged(&self) -> bool {
        self.gpu.is_some()
    }

    /// Buffer bound by draw commands and descriptors
    pub fn handle(&self) -> vk::Buffer {
        match (&self.gpu, &self.host) {
            (Some(gpu), _) => gpu.handle(),
            (None, Some(host)) => host.handle(),
            (None, None) => vk::Buffer::null(),
        }
    }

    /// Write `data` from the start of the buffer
    ///
    /// Staged buffers copy to device memory right away and drop their host
    /// side; a second write is rejected.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let Some(host) = self.host.as_ref() else {
            engine_bail!(SOURCE, @ValidationError, "Staged buffer was already uploaded, it is write-once");
        };
        host.copy_from_host(0, data)?;

        if self.gpu.is_some() {
            self.copy_device()?;
            self.host = None;
            engine_debug!(SOURCE, "Uploaded {} bytes to device-local buffer", data.len());
        }
        Ok(())
    }

    /// Typed variant of [`write_data`](Self::write_data)
    pub fn write_pod<T: bytemuck::Pod>(&mut self, items: &[T]) -> Result<()> {
        self.write_data(bytemuck::cast_slice(items))
    }

    /// Copy the host buffer into the device buffer with a one-time submit
    pub fn copy_device(&self) -> Result<()> {
        let (Some(host), Some(gpu)) = (&self.host, &self.gpu) else {
            engine_bail!(SOURCE, @ValidationError, "copy_device needs both a host and a device buffer");
        };
        self.device.execute_one_time(|_, cb| {
            host.record_copy_to(cb, gpu);
            Ok(())
        })
    }

    /// Contents of the host buffer
    pub fn read_data(&self) -> Result<Vec<u8>> {
        match &self.host {
            Some(host) => host.read_to_host(),
            None => self.read_device(),
        }
    }

    /// Contents of the device buffer, read back through a transfer copy
    pub fn read_device(&self) -> Result<Vec<u8>> {
        let Some(gpu) = &self.gpu else {
            return self.read_data();
        };
        let readback = DeviceBuffer::new(
            &self.device,
            vk::BufferUsageFlags::TRANSFER_DST,
            self.item_size,
            self.item_count,
            true,
        )?;
        self.device.execute_one_time(|_, cb| {
            gpu.record_copy_to(cb, &readback);
            Ok(())
        })?;
        readback.read_to_host()
    }
}
