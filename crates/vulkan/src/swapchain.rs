// Copyright 2026 The Firstlight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

// A swapchain exists when we are presenting to a Surface.  Each swapchain image gets a view and a
// single-attachment framebuffer, and is moved to the present layout before anything else sees it.
// Recreation on resize is not handled; the window is fixed size.

use ash::vk;
use log::{debug, info};

use crate::image;
use crate::prelude::*;
use crate::queue;

/// One presentable render target.  The image belongs to the swapchain, the rest to us.
#[derive(Clone, Copy, Debug)]
pub struct SwapchainBuffer {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub framebuffer: vk::Framebuffer,
}

pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    pub swapchain_loader: ash::khr::swapchain::Device,
    pub swapchain_extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub render_pass: vk::RenderPass,
    buffers: Vec<SwapchainBuffer>,
}

impl Swapchain {
    /// `window_extent` is used when the surface leaves the extent up to the window.
    pub fn new(
        vk_context: &VkContext,
        surface: &Surface,
        window_extent: vk::Extent2D,
        teardown: &mut Teardown,
    ) -> Result<Self, VulkanError> {
        let device = &vk_context.device;
        let physical_device = vk_context.physical_device;
        let surface_format = surface.surface_format;

        let surface_caps = unsafe {
            vk_context
                .surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface.surface)
        }
        .during("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?;

        let present_modes = unsafe {
            vk_context
                .surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface.surface)
        }
        .during("vkGetPhysicalDeviceSurfacePresentModesKHR")?;

        let extent = choose_extent(surface_caps.current_extent, window_extent);
        let present_mode =
            choose_present_mode(&present_modes).ok_or(VulkanError::NoPresentModes)?;
        let image_count =
            choose_image_count(surface_caps.min_image_count, surface_caps.max_image_count);
        info!(
            "swapchain {}x{}, {:?}, {} images requested",
            extent.width, extent.height, present_mode, image_count
        );

        let swapchain_loader = ash::khr::swapchain::Device::new(&vk_context.instance, device);
        let swapchain_info = vk::SwapchainCreateInfoKHR {
            surface: surface.surface,
            min_image_count: image_count,
            image_format: surface_format.format,
            image_color_space: surface_format.color_space,
            image_extent: extent,
            image_array_layers: 1,
            image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            image_sharing_mode: vk::SharingMode::EXCLUSIVE,
            pre_transform: surface_caps.current_transform,
            composite_alpha: pick_alpha(&surface_caps),
            present_mode,
            clipped: vk::TRUE,
            ..Default::default()
        };

        let swapchain = unsafe { swapchain_loader.create_swapchain(&swapchain_info, None) }
            .during("vkCreateSwapchainKHR")?;
        {
            let loader = swapchain_loader.clone();
            teardown.defer("swapchain", move || unsafe {
                loader.destroy_swapchain(swapchain, None)
            });
        }

        let images = unsafe { swapchain_loader.get_swapchain_images(swapchain) }
            .during("vkGetSwapchainImagesKHR")?;
        debug!("swapchain returned {} images", images.len());

        queue::submit_once(
            device,
            vk_context.command_pool,
            vk_context.queue(),
            |cmd_buffer| {
                images.iter().try_for_each(|&image| {
                    image::transition_layout(
                        device,
                        cmd_buffer,
                        image,
                        image::color_range(),
                        vk::ImageLayout::UNDEFINED,
                        vk::ImageLayout::PRESENT_SRC_KHR,
                    )
                })
            },
        )?;

        let render_pass = create_render_pass(device, surface_format.format)?;
        {
            let device = device.clone();
            teardown.defer("render pass", move || unsafe {
                device.destroy_render_pass(render_pass, None)
            });
        }

        let buffers = images
            .iter()
            .map(|&image| {
                create_buffer(
                    device,
                    image,
                    surface_format.format,
                    render_pass,
                    extent,
                    teardown,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            swapchain,
            swapchain_loader,
            swapchain_extent: extent,
            present_mode,
            render_pass,
            buffers,
        })
    }

    pub fn buffers(&self) -> &[SwapchainBuffer] {
        &self.buffers
    }

    pub fn image_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain_extent
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Acquire the next image, signalling `semaphore` when it is ready.  Returns the image index
    /// and whether the swapchain is suboptimal.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<(u32, bool), VulkanError> {
        unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        }
        .during("vkAcquireNextImageKHR")
    }

    /// Queue image `index` for presentation once `wait` is signalled.  Returns whether the
    /// swapchain is suboptimal.
    pub fn present(
        &self,
        queue: vk::Queue,
        index: u32,
        wait: vk::Semaphore,
    ) -> Result<bool, VulkanError> {
        let wait_semaphores = [wait];
        let swapchains = [self.swapchain];
        let indices = [index];

        let present_info = vk::PresentInfoKHR {
            wait_semaphore_count: wait_semaphores.len() as u32,
            p_wait_semaphores: wait_semaphores.as_ptr(),
            swapchain_count: swapchains.len() as u32,
            p_swapchains: swapchains.as_ptr(),
            p_image_indices: indices.as_ptr(),
            ..Default::default()
        };

        unsafe { self.swapchain_loader.queue_present(queue, &present_info) }
            .during("vkQueuePresentKHR")
    }
}

fn create_render_pass(
    device: &ash::Device,
    format: vk::Format,
) -> Result<vk::RenderPass, VulkanError> {
    let attachments = [vk::AttachmentDescription {
        format,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        ..Default::default()
    }];

    let color_refs = [vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];

    let subpasses = [vk::SubpassDescription {
        pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
        color_attachment_count: color_refs.len() as u32,
        p_color_attachments: color_refs.as_ptr(),
        ..Default::default()
    }];

    let render_pass_info = vk::RenderPassCreateInfo {
        attachment_count: attachments.len() as u32,
        p_attachments: attachments.as_ptr(),
        subpass_count: subpasses.len() as u32,
        p_subpasses: subpasses.as_ptr(),
        ..Default::default()
    };

    unsafe { device.create_render_pass(&render_pass_info, None) }.during("vkCreateRenderPass")
}

fn create_buffer(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
    teardown: &mut Teardown,
) -> Result<SwapchainBuffer, VulkanError> {
    let view_info = vk::ImageViewCreateInfo {
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format,
        components: vk::ComponentMapping::default(),
        subresource_range: image::color_range(),
        ..Default::default()
    };
    let view = unsafe { device.create_image_view(&view_info, None) }.during("vkCreateImageView")?;
    {
        let device = device.clone();
        teardown.defer("image view", move || unsafe { device.destroy_image_view(view, None) });
    }

    let attachments = [view];
    let framebuffer_info = vk::FramebufferCreateInfo {
        render_pass,
        attachment_count: attachments.len() as u32,
        p_attachments: attachments.as_ptr(),
        width: extent.width,
        height: extent.height,
        layers: 1,
        ..Default::default()
    };
    let framebuffer = unsafe { device.create_framebuffer(&framebuffer_info, None) }
        .during("vkCreateFramebuffer")?;
    {
        let device = device.clone();
        teardown.defer("framebuffer", move || unsafe {
            device.destroy_framebuffer(framebuffer, None)
        });
    }

    Ok(SwapchainBuffer {
        image,
        view,
        framebuffer,
    })
}

/// The surface reports `u32::MAX` in either dimension when the window decides the extent.
pub fn choose_extent(current: vk::Extent2D, window: vk::Extent2D) -> vk::Extent2D {
    if current.width == u32::MAX || current.height == u32::MAX {
        window
    } else {
        current
    }
}

/// Mailbox, else immediate, else FIFO.  FIFO is always supported, but a surface reporting no
/// modes at all is unusable and gets `None`.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> Option<vk::PresentModeKHR> {
    if modes.is_empty() {
        None
    } else if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        Some(vk::PresentModeKHR::MAILBOX)
    } else if modes.contains(&vk::PresentModeKHR::IMMEDIATE) {
        Some(vk::PresentModeKHR::IMMEDIATE)
    } else {
        Some(vk::PresentModeKHR::FIFO)
    }
}

/// One image above the minimum so acquiring does not stall, capped at the maximum.  A maximum of
/// zero means there is no cap.
pub fn choose_image_count(min_image_count: u32, max_image_count: u32) -> u32 {
    let wanted = min_image_count.saturating_add(1);
    if max_image_count == 0 {
        wanted
    } else {
        wanted.min(max_image_count)
    }
}

pub fn pick_alpha(surface_caps: &vk::SurfaceCapabilitiesKHR) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    ]
    .into_iter()
    .find(|&alpha| surface_caps.supported_composite_alpha.contains(alpha))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::INHERIT)
}
