// Copyright 2026 The Firstlight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Vulkan
//!
//! Bring-up of everything needed to put images on a window, in the order Vulkan demands:
//!
//! - `VkContext` (instance, physical device, logical device, queue, command pool)
//! - `Surface` (window binding, presenting queue family, color format)
//! - `Swapchain` (images, views, framebuffers)
//!
//! Each stage takes the previous stage's output and a `Teardown`.  Every handle a stage acquires
//! is registered on the teardown as soon as it exists, so releasing the teardown destroys children
//! before parents no matter where bring-up stopped.

pub mod context;
pub mod image;
pub mod queue;
pub mod surface;
pub mod swapchain;
pub mod teardown;

use ash::vk;

pub mod prelude {
    pub use super::{ResultExt, VulkanError};
    pub use crate::context::{AppInfo, DeviceSummary, VkContext};
    pub use crate::surface::Surface;
    pub use crate::swapchain::Swapchain;
    pub use crate::teardown::Teardown;
}

#[derive(thiserror::Error, Debug)]
pub enum VulkanError {
    #[error("failed to load the Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error(
        "cannot find a compatible Vulkan installable client driver (ICD); \
         vkCreateInstance returned VK_ERROR_INCOMPATIBLE_DRIVER"
    )]
    IncompatibleDriver,

    #[error("{step} failed: {result}")]
    Call {
        step: &'static str,
        result: vk::Result,
    },

    #[error("no Vulkan physical devices are available")]
    NoPhysicalDevice,

    #[error("physical device exposes no graphics queue family")]
    NoGraphicsQueue,

    #[error("no queue family supports both graphics and presentation to the surface")]
    NoPresentQueue,

    #[error(
        "surface presents from queue family {present}, but the device queue is family {graphics}"
    )]
    PresentQueueMismatch { graphics: u32, present: u32 },

    #[error("surface reports no supported formats")]
    NoSurfaceFormats,

    #[error("surface reports no supported present modes")]
    NoPresentModes,

    #[error("unsupported layout transition: {old:?} -> {new:?}")]
    UnsupportedTransition {
        old: vk::ImageLayout,
        new: vk::ImageLayout,
    },

    #[error("name contains an interior NUL byte: {0}")]
    InvalidName(#[from] std::ffi::NulError),
}

/// Tag a raw Vulkan result with the bring-up step that produced it.
pub trait ResultExt<T> {
    fn during(self, step: &'static str) -> Result<T, VulkanError>;
}

impl<T> ResultExt<T> for ash::prelude::VkResult<T> {
    fn during(self, step: &'static str) -> Result<T, VulkanError> {
        self.map_err(|result| VulkanError::Call { step, result })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_during_names_step() {
        let result: ash::prelude::VkResult<()> = Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        let err = result.during("vkCreateDevice").unwrap_err();
        match &err {
            VulkanError::Call { step, result } => {
                assert_eq!(*step, "vkCreateDevice");
                assert_eq!(*result, vk::Result::ERROR_OUT_OF_HOST_MEMORY);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().starts_with("vkCreateDevice failed"));
    }

    #[test]
    fn test_during_passes_success() {
        let result: ash::prelude::VkResult<u32> = Ok(7);
        assert_eq!(result.during("vkGetSwapchainImagesKHR").unwrap(), 7);
    }
}
