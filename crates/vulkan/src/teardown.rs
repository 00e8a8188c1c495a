// Copyright 2026 The Firstlight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Teardown
//!
//! Vulkan objects must die in the reverse order they were born.  Instead of every owner writing a
//! matching `destroy`, each stage pushes a release action right after a successful create.  The
//! stack is unwound when it is released or dropped, which also covers bring-up that fails halfway.

use log::debug;

type Release = Box<dyn FnOnce()>;

/// A LIFO stack of release actions.
#[derive(Default)]
pub struct Teardown {
    stack: Vec<(&'static str, Release)>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `release` to run before everything registered so far.
    pub fn defer(&mut self, label: &'static str, release: impl FnOnce() + 'static) {
        debug!("acquired {label}");
        self.stack.push((label, Box::new(release)));
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Run every pending release, newest first.  Calling again is a no-op.
    pub fn release_all(&mut self) {
        while let Some((label, release)) = self.stack.pop() {
            debug!("releasing {label}");
            release();
        }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Stands in for the driver, logging every create and destroy in call order.
    #[derive(Clone, Default)]
    struct MockApi {
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl MockApi {
        fn create(&self, teardown: &mut Teardown, label: &'static str) {
            self.calls.borrow_mut().push(format!("create {label}"));
            let calls = self.calls.clone();
            teardown.defer(label, move || calls.borrow_mut().push(format!("destroy {label}")));
        }

        fn destroyed(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|c| c.strip_prefix("destroy ").map(str::to_owned))
                .collect()
        }
    }

    fn scripted_bringup(api: &MockApi, teardown: &mut Teardown, images: usize) {
        api.create(teardown, "instance");
        api.create(teardown, "device");
        api.create(teardown, "command pool");
        api.create(teardown, "surface");
        api.create(teardown, "swapchain");
        api.create(teardown, "render pass");
        for _ in 0..images {
            api.create(teardown, "image view");
            api.create(teardown, "framebuffer");
        }
    }

    #[test]
    fn test_release_is_reverse_of_acquire() {
        let api = MockApi::default();
        let mut teardown = Teardown::new();
        scripted_bringup(&api, &mut teardown, 2);
        assert_eq!(teardown.len(), 10);

        teardown.release_all();
        assert!(teardown.is_empty());

        let created: Vec<String> = api
            .calls
            .borrow()
            .iter()
            .filter_map(|c| c.strip_prefix("create ").map(str::to_owned))
            .collect();
        let mut expected = created.clone();
        expected.reverse();
        assert_eq!(api.destroyed(), expected);
        assert_eq!(api.destroyed().first().unwrap(), "framebuffer");
        assert_eq!(api.destroyed().last().unwrap(), "instance");
    }

    #[test]
    fn test_drop_releases_partial_bringup() {
        let api = MockApi::default();
        {
            let mut teardown = Teardown::new();
            api.create(&mut teardown, "instance");
            api.create(&mut teardown, "device");
            // Bring-up fails here; the stack goes out of scope.
        }
        assert_eq!(api.destroyed(), vec!["device", "instance"]);
    }

    #[test]
    fn test_release_runs_once() {
        let api = MockApi::default();
        let mut teardown = Teardown::new();
        scripted_bringup(&api, &mut teardown, 1);
        teardown.release_all();
        teardown.release_all();
        drop(teardown);
        assert_eq!(api.destroyed().len(), 8);
    }
}
