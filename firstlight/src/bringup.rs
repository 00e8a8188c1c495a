// Copyright 2026 The Firstlight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Bring-up
//!
//! Instance and device, then the window, then surface and swapchain.  Every object lands on one
//! [`Teardown`] so a failure at any stage releases exactly what was built before it.

use ash::vk;
use log::{info, warn};

use firstlight_vulkan::prelude::*;

use crate::config::Config;
use crate::window::WindowSystem;
use crate::FirstlightError;

pub struct Bringup {
    pub vk_context: VkContext,
    pub surface: Surface,
    pub swapchain: Swapchain,
    teardown: Teardown,
}

impl Bringup {
    pub fn new(config: &Config, windows: &mut impl WindowSystem) -> Result<Self, FirstlightError> {
        let mut teardown = Teardown::new();

        let display = windows.display_handle()?;
        let vk_context = VkContext::new(&config.app, display, &mut teardown)?;
        for device in &vk_context.devices {
            println!("{device}");
        }

        let window_config = config.window();
        windows.create_window(&window_config)?;
        let window = windows.window_handle()?;

        let surface = Surface::new(&vk_context, display, window, &mut teardown)?;
        let swapchain =
            Swapchain::new(&vk_context, &surface, window_config.extent(), &mut teardown)?;
        let extent = swapchain.extent();
        info!(
            "bring-up complete: {} {:?} images at {}x{} ({:?}), {} objects to release",
            swapchain.image_count(),
            surface.surface_format.format,
            extent.width,
            extent.height,
            swapchain.present_mode(),
            teardown.len()
        );

        Ok(Self {
            vk_context,
            surface,
            swapchain,
            teardown,
        })
    }

    /// Acquire one image and hand it straight back for presentation.  The semaphore signalled by
    /// the acquire is the one the present waits on.
    pub fn present_once(&mut self) -> Result<(), FirstlightError> {
        let device = self.vk_context.device();
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { device.create_semaphore(&semaphore_info, None) }
            .during("vkCreateSemaphore")?;
        {
            let device = device.clone();
            self.teardown.defer("semaphore", move || unsafe {
                device.destroy_semaphore(semaphore, None)
            });
        }

        let (index, acquire_suboptimal) = self.swapchain.acquire_next_image(semaphore)?;
        let present_suboptimal = self
            .swapchain
            .present(self.vk_context.queue(), index, semaphore)?;
        self.vk_context.wait_idle()?;

        if acquire_suboptimal || present_suboptimal {
            warn!("swapchain is suboptimal for the surface");
        }
        info!("presented image {index}");
        Ok(())
    }
}

impl Drop for Bringup {
    fn drop(&mut self) {
        if let Err(e) = self.vk_context.wait_idle() {
            warn!("releasing without idle device: {e}");
        }
        self.teardown.release_all();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::window::{WindowSignal, WinitWindows};

    // Needs a Vulkan driver and a display.
    #[test]
    #[ignore]
    fn bringup_and_present_on_display() {
        let config = Config {
            width: 320,
            height: 240,
            present: true,
            ..Config::default()
        };
        let mut windows = WinitWindows::new(config.backend).unwrap();
        {
            let mut bringup = Bringup::new(&config, &mut windows).unwrap();
            assert!(bringup.swapchain.image_count() >= 1);
            assert_eq!(bringup.vk_context.queue_family_index, bringup.surface.present_family);
            bringup.present_once().unwrap();
            windows.request_close();
            assert_eq!(windows.wait_event().unwrap(), WindowSignal::CloseRequested);
        }
        windows.destroy_window();
    }
}
