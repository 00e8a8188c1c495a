// Copyright 2026 The Firstlight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Image
//!
//! Layout transitions for images we do not own, such as swapchain images.  Only a handful of
//! layout pairs are used, so the barrier masks are inferred from the pair rather than passed in.

use ash::vk;

use crate::VulkanError;

/// Stage and access masks for one barrier: `(src_stage, dst_stage, src_access, dst_access)`.
pub type BarrierMasks = (
    vk::PipelineStageFlags,
    vk::PipelineStageFlags,
    vk::AccessFlags,
    vk::AccessFlags,
);

/// Single mip, single layer color range.
pub fn color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Infer barrier settings for `old` -> `new`.  `None` for pairs we have no use for.
///
/// Bring-up only needs `UNDEFINED` -> `PRESENT_SRC_KHR`.  The other pairs are the ones a caller
/// needs to clear or draw into an acquired image and hand it back for presentation.
pub fn barrier_masks(old: vk::ImageLayout, new: vk::ImageLayout) -> Option<BarrierMasks> {
    let masks = match (old, new) {
        // Fresh swapchain images, made presentable before anything draws to them.
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::PRESENT_SRC_KHR) => (
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::AccessFlags::empty(),
            vk::AccessFlags::empty(),
        ),
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL) => (
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::empty(),
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ),
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
        ),
        (vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL, vk::ImageLayout::PRESENT_SRC_KHR) => (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::AccessFlags::MEMORY_READ,
        ),
        (vk::ImageLayout::PRESENT_SRC_KHR, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL) => (
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::MEMORY_READ,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::PRESENT_SRC_KHR) => (
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::MEMORY_READ,
        ),
        _ => return None,
    };
    Some(masks)
}

/// Record a layout transition of `image` into `cmd_buffer`.
pub fn transition_layout(
    device: &ash::Device,
    cmd_buffer: vk::CommandBuffer,
    image: vk::Image,
    subresource_range: vk::ImageSubresourceRange,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Result<(), VulkanError> {
    let (src_stage, dst_stage, src_access, dst_access) = barrier_masks(old_layout, new_layout)
        .ok_or(VulkanError::UnsupportedTransition {
            old: old_layout,
            new: new_layout,
        })?;

    let barrier = vk::ImageMemoryBarrier {
        old_layout,
        new_layout,
        src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        image,
        subresource_range,
        src_access_mask: src_access,
        dst_access_mask: dst_access,
        ..Default::default()
    };

    unsafe {
        device.cmd_pipeline_barrier(
            cmd_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
    Ok(())
}
