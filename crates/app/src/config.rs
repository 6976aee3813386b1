//! Command-line configuration.
//!
//! Flags use `--name=value`; unknown flags are ignored and bad values fall
//! back to the defaults with a warning.

use std::path::PathBuf;

use asset::DEFAULT_TEXTURE;

/// Where textures are loaded from.
#[derive(Clone, Debug, PartialEq)]
pub enum AssetRoot {
    /// PNG files under a directory.
    Dir(PathBuf),
    /// Built-in checkerboard for the default texture only.
    Builtin,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backends: wgpu::Backends,
    pub show_fps: bool,
    pub width: u32,
    pub height: u32,
    pub assets: AssetRoot,
    pub default_texture: String,
    pub fail_on_missing_default: bool,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Self {
        let (width, height) = parse_size_args(args);
        Self {
            backends: parse_backend_arg(args),
            show_fps: parse_flag(args, "show-fps").unwrap_or(false),
            width,
            height,
            assets: parse_assets_arg(args),
            default_texture: parse_value(args, "default-texture")
                .unwrap_or(DEFAULT_TEXTURE)
                .to_string(),
            fail_on_missing_default: parse_flag(args, "fail-on-missing-default").unwrap_or(true),
        }
    }
}

/// Last `--name=value` wins.
fn parse_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("--{name}=");
    args.iter()
        .rev()
        .find_map(|arg| arg.strip_prefix(prefix.as_str()))
}

/// `--name` alone means on; `--name=on|off` (also 1/0, true/false, yes/no).
fn parse_flag(args: &[String], name: &str) -> Option<bool> {
    let bare = format!("--{name}");
    let prefix = format!("--{name}=");
    args.iter().rev().find_map(|arg| {
        if *arg == bare {
            return Some(true);
        }
        arg.strip_prefix(prefix.as_str()).map(|val| {
            matches!(
                val.to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            )
        })
    })
}

fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    match parse_value(args, "gpu-backend").map(str::to_ascii_lowercase) {
        None => wgpu::Backends::all(),
        Some(val) => match val.as_str() {
            "auto" => wgpu::Backends::all(),
            "vulkan" | "vk" => wgpu::Backends::VULKAN,
            "dx12" | "d3d12" => wgpu::Backends::DX12,
            "metal" | "mtl" => wgpu::Backends::METAL,
            "gl" | "opengl" | "gles" => wgpu::Backends::GL,
            other => {
                log::warn!("Unknown backend '{}', falling back to auto.", other);
                wgpu::Backends::all()
            }
        },
    }
}

fn parse_size_args(args: &[String]) -> (u32, u32) {
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        }
    }

    (w.unwrap_or(1280).max(1), h.unwrap_or(720).max(1))
}

fn parse_assets_arg(args: &[String]) -> AssetRoot {
    match parse_value(args, "assets") {
        Some("builtin") => AssetRoot::Builtin,
        Some(dir) => AssetRoot::Dir(PathBuf::from(dir)),
        None => AssetRoot::Dir(PathBuf::from(".")),
    }
}
