use std::path::PathBuf;

use clap::{Parser, Subcommand};
use renderer::{ColorSpaceMode, GpuPowerPreference};

use crate::config::parse_surface_size;

#[derive(Parser, Debug)]
#[command(
    name = "cloudmark",
    author,
    version,
    about = "Animated cloud backdrop with a burned-in text label",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; defaults to `<config dir>/cloudmark/config.toml`.
    #[arg(long, value_name = "PATH", env = "CLOUDMARK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Label burned into the backdrop.
    #[arg(long, value_name = "STRING")]
    pub text: Option<String>,

    /// Font file used to rasterize the label.
    #[arg(long, value_name = "PATH")]
    pub font: Option<PathBuf>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size_arg)]
    pub size: Option<(u32, u32)>,

    /// Frame-rate cap (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Seed for a reproducible palette.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE", value_parser = parse_color_space)]
    pub color_space: Option<ColorSpaceMode>,

    /// Adapter power preference: `low` or `high`.
    #[arg(long, value_name = "POWER", value_parser = parse_gpu_power)]
    pub gpu_power: Option<GpuPowerPreference>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the effective configuration as TOML and exit.
    ShowConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_size_arg(value: &str) -> Result<(u32, u32), String> {
    parse_surface_size(value).map_err(|err| err.to_string())
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn parse_gpu_power(value: &str) -> Result<GpuPowerPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" => Ok(GpuPowerPreference::Low),
        "high" | "high-performance" => Ok(GpuPowerPreference::High),
        other => Err(format!("unknown GPU power preference '{other}'; expected low or high")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "cloudmark",
            "--text",
            "hello",
            "--size",
            "800x600",
            "--fps",
            "0",
            "--color-space",
            "linear",
            "--gpu-power",
            "high",
        ])
        .unwrap();
        assert_eq!(cli.run.text.as_deref(), Some("hello"));
        assert_eq!(cli.run.size, Some((800, 600)));
        assert_eq!(cli.run.fps, Some(0.0));
        assert_eq!(cli.run.color_space, Some(ColorSpaceMode::Linear));
        assert_eq!(cli.run.gpu_power, Some(GpuPowerPreference::High));
        assert!(cli.command.is_none());
    }

    #[test]
    fn show_config_subcommand() {
        let cli = Cli::try_parse_from(["cloudmark", "--seed", "3", "show-config"]).unwrap();
        assert!(matches!(cli.command, Some(Command::ShowConfig)));
        assert_eq!(cli.run.seed, Some(3));
    }

    #[test]
    fn rejects_bad_size() {
        assert!(Cli::try_parse_from(["cloudmark", "--size", "800"]).is_err());
        assert!(Cli::try_parse_from(["cloudmark", "--size", "0x600"]).is_err());
    }

    #[test]
    fn color_space_aliases() {
        assert_eq!(parse_color_space("SRGB"), Ok(ColorSpaceMode::Linear));
        assert!(parse_color_space("").is_err());
        assert!(parse_color_space("hdr").is_err());
    }
}
