/// Device - physical/logical GPU, queues, allocator and the shared command pool
///
/// Created once per application and shared (`Arc<Device>`) by every GPU
/// object. Destroyed last, after the GPU went idle.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use prism_engine::prism::render::{Config, SampleCount, TextureFormat};
use prism_engine::prism::{Error, Result};
use prism_engine::{engine_err, engine_error, engine_info, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CStr;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use crate::vulkan_command_buffer::{CommandBuffer, SubmitSync};
use crate::vulkan_convert::{format_to_vk, max_sample_count};

const SOURCE: &str = "prism::vulkan";

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Device extensions that allow depth sample counts above color sample counts
const MIXED_SAMPLE_EXTENSIONS: [&CStr; 2] = [
    c"VK_AMD_mixed_attachment_samples",
    c"VK_NV_framebuffer_mixed_samples",
];

/// Depth formats in order of preference
const DEPTH_CANDIDATES: [TextureFormat; 3] = [
    TextureFormat::D32Sfloat,
    TextureFormat::D32SfloatS8Uint,
    TextureFormat::D24UnormS8Uint,
];

/// Device capabilities captured once at creation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceLimits {
    /// Highest sample count supported by both color and depth framebuffers
    pub max_samples: SampleCount,
    pub max_vertex_attributes: u32,
    pub max_color_attachments: u32,
    /// Best supported depth attachment format
    pub depth_format: TextureFormat,
    pub sampler_anisotropy: bool,
    pub max_anisotropy: f32,
}

pub(crate) fn map_vk_result(e: vk::Result, what: &str) -> Error {
    if e == vk::Result::ERROR_DEVICE_LOST {
        engine_error!(SOURCE, "Device lost during {}", what);
        Error::DeviceLost
    } else if e == vk::Result::ERROR_OUT_OF_DEVICE_MEMORY || e == vk::Result::ERROR_OUT_OF_HOST_MEMORY {
        engine_error!(SOURCE, "Out of memory during {}: {:?}", what, e);
        Error::OutOfMemory
    } else {
        engine_err!(SOURCE, "Failed to {}: {:?}", what, e)
    }
}

fn init_failed(what: &str, detail: impl std::fmt::Debug) -> Error {
    engine_error!(SOURCE, "Failed to {}: {:?}", what, detail);
    Error::InitializationFailed(format!("Failed to {}: {:?}", what, detail))
}

/// Queue family indices of a usable physical device
#[derive(Debug, Clone, Copy)]
struct QueueFamilies {
    graphics: u32,
    present: u32,
}

pub struct Device {
    _entry: ash::Entry,
    instance: ash::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    graphics_queue: vk::Queue,
    graphics_family: u32,
    present_queue: vk::Queue,
    present_family: u32,
    /// Dropped by hand before the logical device
    allocator: ManuallyDrop<Mutex<Allocator>>,
    /// Shared by one-time uploads and the frame command buffers
    command_pool: vk::CommandPool,
    limits: DeviceLimits,
    mixed_samples: bool,
    config: Config,
}

impl Device {
    /// Create the instance, surface, logical device and allocator for `window`
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: Config) -> Result<Arc<Self>> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| init_failed("load the Vulkan library", e))?;

            let app_name = std::ffi::CString::new(config.app_name.as_str())
                .map_err(|e| init_failed("encode the application name", e))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Prism")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window
                .display_handle()
                .map_err(|e| init_failed("get the display handle", e))?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_failed("query the surface extensions", e))?
                .to_vec();

            let layer_names = if config.enable_validation {
                let layers = entry
                    .enumerate_instance_layer_properties()
                    .map_err(|e| init_failed("enumerate instance layers", e))?;
                let available = layers
                    .iter()
                    .any(|l| l.layer_name_as_c_str().map_or(false, |name| name == VALIDATION_LAYER));
                if !available {
                    return Err(init_failed("enable validation", "VK_LAYER_KHRONOS_validation is not installed"));
                }
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                Vec::new()
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed("create the Vulkan instance", e))?;

            let (debug_utils, debug_messenger) = if config.enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);

                crate::debug::init_debug_config(crate::debug::Config {
                    severity: config.debug_severity,
                    output: config.debug_output.clone(),
                    message_filter: config.debug_message_filter,
                    break_on_error: config.break_on_validation_error,
                    panic_on_error: config.panic_on_error,
                    enable_stats: config.enable_validation_stats,
                });

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(crate::debug::severity_flags(config.debug_severity))
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                let messenger = debug_utils
                    .create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| init_failed("create the debug messenger", e))?;
                (Some(debug_utils), Some(messenger))
            } else {
                (None, None)
            };

            let window_handle = window
                .window_handle()
                .map_err(|e| init_failed("get the window handle", e))?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_failed("create the window surface", e))?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, families) =
                Self::pick_physical_device(&instance, &surface_loader, surface)?;

            let properties = instance.get_physical_device_properties(physical_device);
            let features = instance.get_physical_device_features(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string());
            engine_info!(SOURCE, "Using GPU '{}' ({:?})", device_name, properties.device_type);

            let mut device_extensions = vec![ash::khr::swapchain::NAME.as_ptr()];
            let mixed_samples = if config.enable_mixed_samples {
                match Self::find_mixed_sample_extension(&instance, physical_device)? {
                    Some(name) => {
                        device_extensions.push(name.as_ptr());
                        true
                    }
                    None => {
                        engine_warn!(SOURCE, "Mixed attachment samples requested but not supported, disabled");
                        false
                    }
                }
            } else {
                false
            };

            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
                .queue_family_index(families.graphics)
                .queue_priorities(&queue_priorities)];
            if families.present != families.graphics {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(families.present)
                        .queue_priorities(&queue_priorities),
                );
            }

            let sampler_anisotropy = features.sampler_anisotropy == vk::TRUE;
            let enabled_features = vk::PhysicalDeviceFeatures::default()
                .sampler_anisotropy(sampler_anisotropy)
                .fill_mode_non_solid(features.fill_mode_non_solid == vk::TRUE);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extensions)
                .enabled_features(&enabled_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_failed("create the logical device", e))?;

            let graphics_queue = device.get_device_queue(families.graphics, 0);
            let present_queue = device.get_device_queue(families.present, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_failed("create the GPU allocator", e))?;

            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(families.graphics)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = device
                .create_command_pool(&pool_info, None)
                .map_err(|e| init_failed("create the command pool", e))?;

            let limits = DeviceLimits {
                max_samples: max_sample_count(
                    properties.limits.framebuffer_color_sample_counts
                        & properties.limits.framebuffer_depth_sample_counts,
                ),
                max_vertex_attributes: properties.limits.max_vertex_input_attributes,
                max_color_attachments: properties.limits.max_color_attachments,
                depth_format: Self::pick_depth_format(&instance, physical_device)?,
                sampler_anisotropy,
                max_anisotropy: properties.limits.max_sampler_anisotropy,
            };
            engine_info!(
                SOURCE,
                "Device limits: {} samples, {} vertex attributes, {} color attachments, depth {:?}",
                limits.max_samples.count(),
                limits.max_vertex_attributes,
                limits.max_color_attachments,
                limits.depth_format
            );

            Ok(Arc::new(Self {
                _entry: entry,
                instance,
                debug_utils,
                debug_messenger,
                surface_loader,
                surface,
                physical_device,
                device,
                graphics_queue,
                graphics_family: families.graphics,
                present_queue,
                present_family: families.present,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                command_pool,
                limits,
                mixed_samples,
                config,
            }))
        }
    }

    /// First device with graphics and present queues and the swapchain
    /// extension, discrete GPUs first
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| init_failed("enumerate physical devices", e))?;

        let mut candidates = Vec::new();
        for physical_device in physical_devices {
            let Some(families) = Self::find_queue_families(instance, surface_loader, surface, physical_device) else {
                continue;
            };
            if !Self::has_extension(instance, physical_device, ash::khr::swapchain::NAME)? {
                continue;
            }
            let device_type = instance.get_physical_device_properties(physical_device).device_type;
            candidates.push((device_type != vk::PhysicalDeviceType::DISCRETE_GPU, physical_device, families));
        }
        candidates.sort_by_key(|(not_discrete, ..)| *not_discrete);

        candidates
            .into_iter()
            .next()
            .map(|(_, physical_device, families)| (physical_device, families))
            .ok_or_else(|| init_failed("find a GPU", "no device with graphics, present and swapchain support"))
    }

    unsafe fn find_queue_families(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
    ) -> Option<QueueFamilies> {
        let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
        let supports_present = |index: u32| {
            surface_loader
                .get_physical_device_surface_support(physical_device, index, surface)
                .unwrap_or(false)
        };

        let graphics = queue_families
            .iter()
            .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))? as u32;
        let present = if supports_present(graphics) {
            graphics
        } else {
            (0..queue_families.len() as u32).find(|&i| supports_present(i))?
        };
        Some(QueueFamilies { graphics, present })
    }

    unsafe fn has_extension(instance: &ash::Instance, physical_device: vk::PhysicalDevice, name: &CStr) -> Result<bool> {
        let extensions = instance
            .enumerate_device_extension_properties(physical_device)
            .map_err(|e| init_failed("enumerate device extensions", e))?;
        Ok(extensions
            .iter()
            .any(|ext| ext.extension_name_as_c_str().map_or(false, |n| n == name)))
    }

    unsafe fn find_mixed_sample_extension(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Option<&'static CStr>> {
        for name in MIXED_SAMPLE_EXTENSIONS {
            if Self::has_extension(instance, physical_device, name)? {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    unsafe fn pick_depth_format(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Result<TextureFormat> {
        DEPTH_CANDIDATES
            .into_iter()
            .find(|format| {
                instance
                    .get_physical_device_format_properties(physical_device, format_to_vk(*format))
                    .optimal_tiling_features
                    .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            })
            .ok_or_else(|| init_failed("find a depth format", "no supported depth attachment format"))
    }

    // ===== ACCESSORS =====

    pub fn raw(&self) -> &ash::Device {
        &self.device
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn graphics_family(&self) -> u32 {
        self.graphics_family
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn present_family(&self) -> u32 {
        self.present_family
    }

    pub fn command_pool(&self) -> vk::CommandPool {
        self.command_pool
    }

    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// True when depth may carry more samples than color
    pub fn mixed_samples(&self) -> bool {
        self.mixed_samples
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ===== MEMORY =====

    /// Allocate memory for `requirements` at `location`
    pub fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut allocator = self
            .allocator
            .lock()
            .map_err(|e| engine_err!(SOURCE, "Failed to lock allocator: {}", e))?;
        allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                engine_error!(
                    SOURCE,
                    "Out of GPU memory allocating '{}' ({:.2} MB): {:?}",
                    name,
                    requirements.size as f64 / (1024.0 * 1024.0),
                    e
                );
                Error::OutOfMemory
            })
    }

    /// Return an allocation to the allocator
    pub fn free(&self, allocation: Allocation) {
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }

    /// True when `format` can be blitted with linear filtering
    pub fn supports_linear_blit(&self, format: TextureFormat) -> bool {
        let features = unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format_to_vk(format))
                .optimal_tiling_features
        };
        features.contains(
            vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR
                | vk::FormatFeatureFlags::BLIT_SRC
                | vk::FormatFeatureFlags::BLIT_DST,
        )
    }

    // ===== SUBMISSION =====

    /// Record commands into a one-shot command buffer, submit and wait idle
    ///
    /// Synchronous; meant for uploads and readbacks, never per frame.
    pub fn execute_one_time<F>(self: &Arc<Self>, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer) -> Result<()>,
    {
        let mut cmd = CommandBuffer::new(self)?;
        cmd.begin()?;
        record(&self.device, cmd.handle())?;
        cmd.end()?;
        cmd.submit(&SubmitSync {
            wait_idle: true,
            ..SubmitSync::default()
        })
    }

    /// Block until the GPU finished all submitted work
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| map_vk_result(e, "wait for device idle"))
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // Allocator pages go before the device
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_command_pool(self.command_pool, None);

            crate::debug::cleanup_debug_config();
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}
