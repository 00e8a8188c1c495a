// Copyright 2026 The Firstlight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Window
//!
//! The native window sits behind [`WindowSystem`] so bring-up only ever sees raw handles.
//! [`WinitWindows`] drives `winit` by pumping its event loop on demand.  The handler state travels
//! with each pump call rather than living in a global.

use std::collections::VecDeque;
use std::time::Duration;

use ash::vk;
use log::{debug, info, warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::Backend;

pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;

#[derive(thiserror::Error, Debug)]
pub enum WindowError {
    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("creating window: {0}")]
    Create(#[from] winit::error::OsError),

    #[error("native handle: {0}")]
    Handle(#[from] raw_window_handle::HandleError),

    #[error("no window has been created")]
    NoWindow,

    #[error("event loop exited with code {0}")]
    Exited(i32),

    #[cfg(not(target_os = "linux"))]
    #[error("{0:?} backend is not available on this platform")]
    UnsupportedBackend(Backend),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl WindowConfig {
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

/// What bring-up cares about from the event stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowSignal {
    CloseRequested,
    Other,
}

/// A native window system able to host one window.
pub trait WindowSystem {
    /// Available before any window exists, for instance creation.
    fn display_handle(&self) -> Result<RawDisplayHandle, WindowError>;

    fn create_window(&mut self, config: &WindowConfig) -> Result<(), WindowError>;

    fn window_handle(&self) -> Result<RawWindowHandle, WindowError>;

    /// Block until the next event arrives.
    fn wait_event(&mut self) -> Result<WindowSignal, WindowError>;

    /// Make the next [`WindowSystem::wait_event`] report a close.
    fn request_close(&mut self);

    /// Must only be called once nothing references the window handle.
    fn destroy_window(&mut self);
}

/// Block on events until the window is asked to close.  Returns the number of events handled,
/// the close included.
pub fn run_event_loop(windows: &mut impl WindowSystem) -> Result<usize, WindowError> {
    let mut handled = 0;
    loop {
        let signal = windows.wait_event()?;
        handled += 1;
        if signal == WindowSignal::CloseRequested {
            debug!("close requested after {handled} events");
            return Ok(handled);
        }
    }
}

#[derive(Default)]
struct Handler {
    /// Opened on the next resume or idle callback.
    pending: Option<WindowAttributes>,
    window: Option<Window>,
    error: Option<winit::error::OsError>,
    signals: VecDeque<WindowSignal>,
}

impl Handler {
    /// Jump the queue so the close is the next signal seen.
    fn close(&mut self) {
        self.signals.push_front(WindowSignal::CloseRequested);
    }

    fn open_pending(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(attrs) = self.pending.take() {
            match event_loop.create_window(attrs) {
                Ok(window) => {
                    info!("window {:?} opened", window.id());
                    self.window = Some(window);
                }
                Err(e) => self.error = Some(e),
            }
        }
    }
}

impl ApplicationHandler for Handler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.open_pending(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.open_pending(event_loop);
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let signal = match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => WindowSignal::CloseRequested,
            _ => WindowSignal::Other,
        };
        self.signals.push_back(signal);
    }
}

pub struct WinitWindows {
    event_loop: EventLoop<()>,
    handler: Handler,
}

impl WinitWindows {
    pub fn new(backend: Backend) -> Result<Self, WindowError> {
        let mut builder = EventLoop::builder();
        match backend {
            Backend::Auto => {}
            #[cfg(target_os = "linux")]
            Backend::X11 => {
                use winit::platform::x11::EventLoopBuilderExtX11;
                builder.with_x11();
            }
            #[cfg(target_os = "linux")]
            Backend::Wayland => {
                use winit::platform::wayland::EventLoopBuilderExtWayland;
                builder.with_wayland();
            }
            #[cfg(not(target_os = "linux"))]
            other => return Err(WindowError::UnsupportedBackend(other)),
        }
        let event_loop = builder.build()?;
        debug!("event loop ready ({backend:?})");

        Ok(Self {
            event_loop,
            handler: Handler::default(),
        })
    }

    fn pump(&mut self, timeout: Option<Duration>) -> Result<(), WindowError> {
        match self.event_loop.pump_app_events(timeout, &mut self.handler) {
            PumpStatus::Continue => Ok(()),
            PumpStatus::Exit(code) => Err(WindowError::Exited(code)),
        }
    }
}

impl WindowSystem for WinitWindows {
    fn display_handle(&self) -> Result<RawDisplayHandle, WindowError> {
        Ok(self.event_loop.display_handle()?.as_raw())
    }

    fn create_window(&mut self, config: &WindowConfig) -> Result<(), WindowError> {
        if self.handler.window.is_some() {
            warn!("replacing existing window");
            self.handler.window = None;
        }
        self.handler.pending = Some(
            Window::default_attributes()
                .with_title(config.title.as_str())
                .with_inner_size(PhysicalSize::new(config.width, config.height))
                .with_resizable(false),
        );

        while self.handler.window.is_none() {
            self.pump(Some(Duration::ZERO))?;
            if let Some(e) = self.handler.error.take() {
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn window_handle(&self) -> Result<RawWindowHandle, WindowError> {
        let window = self.handler.window.as_ref().ok_or(WindowError::NoWindow)?;
        Ok(window.window_handle()?.as_raw())
    }

    fn wait_event(&mut self) -> Result<WindowSignal, WindowError> {
        loop {
            if let Some(signal) = self.handler.signals.pop_front() {
                return Ok(signal);
            }
            self.pump(None)?;
        }
    }

    fn request_close(&mut self) {
        self.handler.close();
    }

    fn destroy_window(&mut self) {
        if let Some(window) = self.handler.window.take() {
            debug!("destroying window {:?}", window.id());
            drop(window);
            // Let the window system see the destruction.
            if let Err(e) = self.pump(Some(Duration::ZERO)) {
                warn!("after destroying window: {e}");
            }
        }
        self.handler.signals.clear();
    }
}
