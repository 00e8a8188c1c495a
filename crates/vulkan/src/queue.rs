// Copyright 2026 The Firstlight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Queue
//!
//! Queue family choice and one-shot command submission.  The device is opened with a single queue
//! from the first graphics family.  Presentation support can only be asked once a surface exists,
//! so that choice is made later by `Surface` from the `(graphics, present)` pairs built here.

use ash::vk;
use log::warn;

use crate::prelude::*;

/// Return the index of the first family advertising graphics.
pub fn graphics_family(qfps: &[vk::QueueFamilyProperties]) -> Option<u32> {
    qfps.iter()
        .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|i| i as u32)
}

/// Return the smallest index whose family is both graphics capable and able to present.
///
/// Items are `(graphics, present)` in family order.
pub fn present_family(families: impl IntoIterator<Item = (bool, bool)>) -> Option<u32> {
    families
        .into_iter()
        .position(|(graphics, present)| graphics && present)
        .map(|i| i as u32)
}

/// Record a primary command buffer with `record`, submit it, and wait for the queue to drain.
pub fn submit_once(
    device: &ash::Device,
    pool: vk::CommandPool,
    queue: vk::Queue,
    record: impl FnOnce(vk::CommandBuffer) -> Result<(), VulkanError>,
) -> Result<(), VulkanError> {
    let alloc_info = vk::CommandBufferAllocateInfo {
        command_pool: pool,
        level: vk::CommandBufferLevel::PRIMARY,
        command_buffer_count: 1,
        ..Default::default()
    };

    let command_buffers = unsafe { device.allocate_command_buffers(&alloc_info) }
        .during("vkAllocateCommandBuffers")?;
    let command_buffer = command_buffers[0];

    let result = record_and_submit(device, queue, command_buffer, record);
    release_after(
        result,
        || unsafe { device.device_wait_idle() }.during("vkDeviceWaitIdle"),
        || unsafe { device.free_command_buffers(pool, &command_buffers) },
    )
}

/// Free after success.  After a failure the buffer may still be pending, so it is only freed once
/// the device drains, and leaked if even that fails.
fn release_after(
    result: Result<(), VulkanError>,
    wait_idle: impl FnOnce() -> Result<(), VulkanError>,
    free: impl FnOnce(),
) -> Result<(), VulkanError> {
    match &result {
        Ok(()) => free(),
        Err(_) => match wait_idle() {
            Ok(()) => free(),
            Err(e) => warn!("leaking one-shot command buffer: {e}"),
        },
    }
    result
}

fn record_and_submit(
    device: &ash::Device,
    queue: vk::Queue,
    command_buffer: vk::CommandBuffer,
    record: impl FnOnce(vk::CommandBuffer) -> Result<(), VulkanError>,
) -> Result<(), VulkanError> {
    let begin_info = vk::CommandBufferBeginInfo {
        flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
        ..Default::default()
    };

    unsafe { device.begin_command_buffer(command_buffer, &begin_info) }
        .during("vkBeginCommandBuffer")?;
    record(command_buffer)?;
    unsafe { device.end_command_buffer(command_buffer) }.during("vkEndCommandBuffer")?;

    let command_buffers = [command_buffer];
    let submit = vk::SubmitInfo {
        command_buffer_count: command_buffers.len() as u32,
        p_command_buffers: command_buffers.as_ptr(),
        ..Default::default()
    };

    unsafe {
        device
            .queue_submit(queue, &[submit], vk::Fence::null())
            .during("vkQueueSubmit")?;
        device.queue_wait_idle(queue).during("vkQueueWaitIdle")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    fn failed(step: &'static str, result: vk::Result) -> Result<(), VulkanError> {
        Err(VulkanError::Call { step, result })
    }

    #[test]
    fn test_success_frees_without_waiting() {
        let (mut waited, mut freed) = (false, false);
        release_after(
            Ok(()),
            || {
                waited = true;
                Ok(())
            },
            || freed = true,
        )
        .unwrap();
        assert!(!waited);
        assert!(freed);
    }

    #[test]
    fn test_failure_drains_before_free() {
        let order = std::cell::RefCell::new(Vec::new());
        let result = release_after(
            failed("vkQueueWaitIdle", vk::Result::ERROR_DEVICE_LOST),
            || {
                order.borrow_mut().push("wait");
                Ok(())
            },
            || order.borrow_mut().push("free"),
        );
        assert!(matches!(result, Err(VulkanError::Call { step: "vkQueueWaitIdle", .. })));
        assert_eq!(*order.borrow(), ["wait", "free"]);
    }

    #[test]
    fn test_lost_device_skips_free() {
        let mut freed = false;
        let result = release_after(
            failed("vkQueueWaitIdle", vk::Result::ERROR_DEVICE_LOST),
            || failed("vkDeviceWaitIdle", vk::Result::ERROR_DEVICE_LOST),
            || freed = true,
        );
        assert!(!freed);
        // The original failure is the one reported.
        assert!(matches!(result, Err(VulkanError::Call { step: "vkQueueWaitIdle", .. })));
    }

    #[test]
    fn test_graphics_family_first_match() {
        let qfps = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::COMPUTE | vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
        ];
        assert_eq!(graphics_family(&qfps), Some(1));
    }

    #[test]
    fn test_graphics_family_none() {
        let qfps = [family(vk::QueueFlags::TRANSFER), family(vk::QueueFlags::COMPUTE)];
        assert_eq!(graphics_family(&qfps), None);
        assert_eq!(graphics_family(&[]), None);
    }

    #[test]
    fn test_present_family_needs_both() {
        let pairs = [(true, false), (false, true), (true, true), (true, true)];
        assert_eq!(present_family(pairs), Some(2));
    }

    #[test]
    fn test_present_family_first_index() {
        assert_eq!(present_family([(true, true), (true, true)]), Some(0));
    }

    #[test]
    fn test_present_family_no_match() {
        assert_eq!(present_family([(true, false), (false, true), (false, false)]), None);
        assert_eq!(present_family(std::iter::empty()), None);
    }

    #[test]
    fn test_present_family_matches_exhaustive_scan() {
        // Every combination of up to four families.
        for len in 0..=4u32 {
            for bits in 0..(1u32 << (2 * len)) {
                let pairs: Vec<(bool, bool)> = (0..len)
                    .map(|i| ((bits >> (2 * i)) & 1 == 1, (bits >> (2 * i + 1)) & 1 == 1))
                    .collect();
                let expected = (0..len).find(|&i| pairs[i as usize] == (true, true));
                assert_eq!(present_family(pairs.iter().copied()), expected);
            }
        }
    }
}
