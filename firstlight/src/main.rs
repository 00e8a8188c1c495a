// Copyright 2026 The Firstlight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod bringup;
mod config;
mod window;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;

use firstlight_vulkan::VulkanError;

use crate::bringup::Bringup;
use crate::config::{Backend, Config, ConfigError};
use crate::window::{WindowError, WindowSystem, WinitWindows};

#[derive(Parser, Debug, Default)]
#[command(name = "firstlight", version, about = "Bring up a Vulkan swapchain on a native window")]
pub(crate) struct Args {
    /// Path to a TOML config file (default: <config dir>/firstlight/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Window width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Window height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Window system backend
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Enable the Khronos validation layer when installed
    #[arg(long)]
    validation: bool,

    /// Acquire and present one swapchain image after bring-up
    #[arg(long)]
    present: bool,

    /// Close the window as soon as bring-up finishes
    #[arg(long)]
    once: bool,
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum FirstlightError {
    #[error("vulkan: {0}")]
    Vulkan(#[from] VulkanError),

    #[error("window system: {0}")]
    Window(#[from] WindowError),

    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
}

fn run(args: &Args) -> Result<(), FirstlightError> {
    let config = Config::load(args)?;
    let mut windows = WinitWindows::new(config.backend)?;

    let handled = {
        let mut bringup = Bringup::new(&config, &mut windows)?;
        if config.present {
            bringup.present_once()?;
        }
        if args.once {
            windows.request_close();
        }
        window::run_event_loop(&mut windows)?
        // Vulkan objects go here, while the window they reference still exists.
    };

    windows.destroy_window();
    info!("closed after {handled} events");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("bring-up failed: {err:?}");
            eprintln!("firstlight: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "firstlight",
            "-v",
            "--width",
            "640",
            "--backend",
            "x11",
            "--present",
        ]);
        assert!(args.verbose);
        assert_eq!(args.width, Some(640));
        assert_eq!(args.height, None);
        assert_eq!(args.backend, Some(Backend::X11));
        assert!(args.present);
        assert!(!args.once);
    }

    #[test]
    fn test_error_names_failed_step() {
        let err = FirstlightError::from(VulkanError::Call {
            step: "vkCreateSwapchainKHR",
            result: ash::vk::Result::ERROR_SURFACE_LOST_KHR,
        });
        let message = err.to_string();
        assert!(message.starts_with("vulkan: vkCreateSwapchainKHR failed"), "{message}");
    }
}
