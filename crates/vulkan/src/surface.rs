// Copyright 2026 The Firstlight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Surface
//!
//! Binds a native window to the instance and decides the two things the swapchain needs from it
//! up front: which queue family presents, and which color format to render in.

use ash::vk;
use log::{debug, info};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::prelude::*;
use crate::queue;

/// Used when the surface has no preference and reports a lone `UNDEFINED` format.
pub const DEFAULT_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

pub struct Surface {
    pub surface: vk::SurfaceKHR,
    pub surface_format: vk::SurfaceFormatKHR,
    /// First family that is graphics capable and can present to this surface.
    pub present_family: u32,
}

impl Surface {
    /// Wrap the native window in a surface.  The window must outlive the release registered on
    /// `teardown`.
    pub fn new(
        vk_context: &VkContext,
        display: RawDisplayHandle,
        window: RawWindowHandle,
        teardown: &mut Teardown,
    ) -> Result<Self, VulkanError> {
        let surface = unsafe {
            ash_window::create_surface(
                &vk_context.entry,
                &vk_context.instance,
                display,
                window,
                None,
            )
        }
        .during("vkCreateSurfaceKHR")?;
        {
            let loader = vk_context.surface_loader.clone();
            teardown.defer("surface", move || unsafe { loader.destroy_surface(surface, None) });
        }

        let physical_device = vk_context.physical_device;
        let qfps = unsafe {
            vk_context
                .instance
                .get_physical_device_queue_family_properties(physical_device)
        };

        let mut families = Vec::with_capacity(qfps.len());
        for (index, qf) in qfps.iter().enumerate() {
            let present = unsafe {
                vk_context.surface_loader.get_physical_device_surface_support(
                    physical_device,
                    index as u32,
                    surface,
                )
            }
            .during("vkGetPhysicalDeviceSurfaceSupportKHR")?;
            let graphics = qf.queue_flags.contains(vk::QueueFlags::GRAPHICS);
            debug!("queue family {index}: graphics={graphics} present={present}");
            families.push((graphics, present));
        }

        let present_family = queue::present_family(families).ok_or(VulkanError::NoPresentQueue)?;
        if present_family != vk_context.queue_family_index {
            return Err(VulkanError::PresentQueueMismatch {
                graphics: vk_context.queue_family_index,
                present: present_family,
            });
        }

        let formats = unsafe {
            vk_context
                .surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
        }
        .during("vkGetPhysicalDeviceSurfaceFormatsKHR")?;
        let surface_format = choose_surface_format(&formats).ok_or(VulkanError::NoSurfaceFormats)?;
        info!(
            "surface format {:?} / {:?}, presenting from family {present_family}",
            surface_format.format, surface_format.color_space
        );

        Ok(Self {
            surface,
            surface_format,
            present_family,
        })
    }
}

/// A lone `UNDEFINED` entry means "anything goes" and gets `DEFAULT_FORMAT`.  Otherwise the first
/// reported format wins, unranked.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    match formats {
        [] => None,
        [only] if only.format == vk::Format::UNDEFINED => Some(DEFAULT_FORMAT),
        [first, ..] => Some(*first),
    }
}
