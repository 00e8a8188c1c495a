// Copyright 2026 The Firstlight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context
//!
//! Fundamentally required resources, including the entry, instance, hardware devices
//! are encapsulated by `VkContext`.
//!
//! Initializing a physical device for use results in a logical `ash::Device` with one queue and
//! the swapchain extension enabled.  The first enumerated physical device is always used.

use std::ffi::{c_char, CStr, CString};
use std::fmt;

use ash::vk;
use log::{debug, info, warn};
use raw_window_handle::RawDisplayHandle;
use smallvec::SmallVec;

use crate::prelude::*;
use crate::queue;

static VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Identity strings and switches handed to the driver at instance creation.
#[derive(Clone, Debug)]
pub struct AppInfo {
    pub application: String,
    pub engine: String,
    /// Request the Khronos validation layer when the loader has it.
    pub validation: bool,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            application: "Vulkan Example".to_owned(),
            engine: "Vulkan Engine".to_owned(),
            validation: false,
        }
    }
}

/// The properties worth showing a human about one physical device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceSummary {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub driver_version: u32,
    pub api_version: u32,
}

impl DeviceSummary {
    pub fn from_properties(props: &vk::PhysicalDeviceProperties) -> Self {
        let name: Vec<u8> = props
            .device_name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();

        Self {
            name: String::from_utf8_lossy(&name).into_owned(),
            device_type: props.device_type,
            driver_version: props.driver_version,
            api_version: props.api_version,
        }
    }
}

impl fmt::Display for DeviceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device Name:    {}", self.name)?;
        writeln!(f, "Device Type:    {:?}", self.device_type)?;
        writeln!(f, "Driver Version: {}", self.driver_version)?;
        write!(
            f,
            "API Version:    {}.{}.{}",
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version)
        )
    }
}

pub struct VkContext {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    /// Used to access surface query functions
    pub surface_loader: ash::khr::surface::Instance,

    pub physical_device: vk::PhysicalDevice,
    /// Every enumerated device, in enumeration order.  Index 0 is the one in use.
    pub devices: Vec<DeviceSummary>,

    /// Vulkan logical device
    pub device: ash::Device,
    queue: vk::Queue,
    pub queue_family_index: u32,
    pub command_pool: vk::CommandPool,
}

impl VkContext {
    /// Obtain an entry, instance, and initialized device able to present to windows on `display`.
    ///
    /// Instance, device, and command pool are registered on `teardown`.
    pub fn new(
        app: &AppInfo,
        display: RawDisplayHandle,
        teardown: &mut Teardown,
    ) -> Result<Self, VulkanError> {
        let entry = unsafe { ash::Entry::load()? };
        let instance = create_instance(&entry, app, display)?;
        {
            let entry = entry.clone();
            let instance = instance.clone();
            teardown.defer("instance", move || unsafe {
                instance.destroy_instance(None);
                // The loader must outlive the instance function table.
                drop(entry);
            });
        }

        let physical_devices =
            unsafe { instance.enumerate_physical_devices() }.during("vkEnumeratePhysicalDevices")?;
        let devices: Vec<DeviceSummary> = physical_devices
            .iter()
            .map(|&pd| DeviceSummary::from_properties(&unsafe {
                instance.get_physical_device_properties(pd)
            }))
            .collect();

        // NOTE no selection heuristic.  Device 0 it is.
        let physical_device = *physical_devices
            .first()
            .ok_or(VulkanError::NoPhysicalDevice)?;
        info!(
            "{} physical device(s), using {:?}",
            devices.len(),
            devices[0].name
        );

        let qfps = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        let queue_family_index =
            queue::graphics_family(&qfps).ok_or(VulkanError::NoGraphicsQueue)?;
        debug!("device queue family {queue_family_index}");

        let queue_priorities = [1.0];
        let queue_info = [vk::DeviceQueueCreateInfo {
            queue_family_index,
            queue_count: 1,
            p_queue_priorities: queue_priorities.as_ptr(),
            ..Default::default()
        }];

        let device_extensions = [ash::vk::KHR_SWAPCHAIN_NAME.as_ptr()];

        let device_info = vk::DeviceCreateInfo {
            queue_create_info_count: queue_info.len() as u32,
            p_queue_create_infos: queue_info.as_ptr(),
            pp_enabled_extension_names: device_extensions.as_ptr(),
            enabled_extension_count: device_extensions.len() as u32,
            ..Default::default()
        };

        let device = unsafe { instance.create_device(physical_device, &device_info, None) }
            .during("vkCreateDevice")?;
        {
            let device = device.clone();
            teardown.defer("device", move || unsafe { device.destroy_device(None) });
        }
        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        let command_pool_info = vk::CommandPoolCreateInfo {
            flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            queue_family_index,
            ..Default::default()
        };

        let command_pool = unsafe { device.create_command_pool(&command_pool_info, None) }
            .during("vkCreateCommandPool")?;
        {
            let device = device.clone();
            teardown.defer("command pool", move || unsafe {
                device.destroy_command_pool(command_pool, None)
            });
        }

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        Ok(Self {
            entry,
            instance,
            surface_loader,

            physical_device,
            devices,

            device,
            queue,
            queue_family_index,
            command_pool,
        })
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Block until the device has no work in flight.
    pub fn wait_idle(&self) -> Result<(), VulkanError> {
        unsafe { self.device.device_wait_idle() }.during("vkDeviceWaitIdle")
    }
}

fn create_instance(
    entry: &ash::Entry,
    app: &AppInfo,
    display: RawDisplayHandle,
) -> Result<ash::Instance, VulkanError> {
    let application_name = CString::new(app.application.as_str())?;
    let engine_name = CString::new(app.engine.as_str())?;

    let surface_exts = ash_window::enumerate_required_extensions(display)
        .during("enumerating surface extensions")?;
    let mut required_exts: SmallVec<*const c_char, 4> = SmallVec::new();
    required_exts.extend(surface_exts.iter().copied());
    for &ext in surface_exts {
        debug!("instance extension {:?}", unsafe { CStr::from_ptr(ext) });
    }

    let mut layers: SmallVec<*const c_char, 1> = SmallVec::new();
    if app.validation {
        if validation_available(entry)? {
            layers.push(VALIDATION_LAYER.as_ptr());
            info!("validation layer enabled");
        } else {
            warn!("validation requested but {VALIDATION_LAYER:?} is not installed");
        }
    }

    let app_info = vk::ApplicationInfo {
        p_application_name: application_name.as_ptr(),
        p_engine_name: engine_name.as_ptr(),
        api_version: vk::make_api_version(0, 1, 0, 0),
        ..Default::default()
    };

    let create_info = vk::InstanceCreateInfo {
        p_application_info: &app_info,
        enabled_extension_count: required_exts.len() as u32,
        pp_enabled_extension_names: required_exts.as_ptr(),
        enabled_layer_count: layers.len() as u32,
        pp_enabled_layer_names: layers.as_ptr(),
        ..Default::default()
    };

    unsafe { entry.create_instance(&create_info, None) }.map_err(instance_error)
}

/// A missing or unsuitable ICD gets its own diagnostic.
fn instance_error(result: vk::Result) -> VulkanError {
    match result {
        vk::Result::ERROR_INCOMPATIBLE_DRIVER => VulkanError::IncompatibleDriver,
        result => VulkanError::Call {
            step: "vkCreateInstance",
            result,
        },
    }
}

fn validation_available(entry: &ash::Entry) -> Result<bool, VulkanError> {
    let layers = unsafe { entry.enumerate_instance_layer_properties() }
        .during("vkEnumerateInstanceLayerProperties")?;
    Ok(layers
        .iter()
        .any(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) } == VALIDATION_LAYER))
}
