//! Layered configuration: built-in defaults, then the TOML file, then flags.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use renderer::{ColorSpaceMode, GpuPowerPreference, RendererConfig};
use serde::{Deserialize, Serialize, Serializer};

use crate::cli::{parse_color_space, parse_gpu_power, RunArgs};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub label: LabelFile,
    pub window: WindowFile,
    pub palette: PaletteFile,
    pub gpu: GpuFile,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelFile {
    pub text: Option<String>,
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowFile {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f32>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaletteFile {
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpuFile {
    pub color_space: Option<String>,
    pub power: Option<String>,
}

impl FileConfig {
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }
}

/// Fully resolved settings, in the same shape as the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub label: LabelSettings,
    pub window: WindowSettings,
    pub palette: PaletteSettings,
    pub gpu: GpuSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelSettings {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    /// 0 means uncapped.
    pub fps: f32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuSettings {
    #[serde(serialize_with = "as_display")]
    pub color_space: ColorSpaceMode,
    #[serde(serialize_with = "as_display")]
    pub power: GpuPowerPreference,
}

fn as_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl Default for Settings {
    fn default() -> Self {
        let defaults = RendererConfig::default();
        Self {
            label: LabelSettings {
                text: defaults.label,
                font: defaults.font_path,
            },
            window: WindowSettings {
                width: defaults.surface_size.0,
                height: defaults.surface_size.1,
                fps: defaults.target_fps.unwrap_or(0.0),
                title: defaults.title,
            },
            palette: PaletteSettings {
                seed: defaults.palette_seed,
            },
            gpu: GpuSettings {
                color_space: defaults.color_space,
                power: defaults.gpu_power,
            },
        }
    }
}

impl Settings {
    pub fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        let FileConfig {
            label,
            window,
            palette,
            gpu,
        } = file;

        if let Some(text) = label.text {
            self.label.text = text;
        }
        if label.font.is_some() {
            self.label.font = label.font;
        }
        if let Some(width) = window.width {
            self.window.width = width;
        }
        if let Some(height) = window.height {
            self.window.height = height;
        }
        if let Some(fps) = window.fps {
            self.window.fps = fps;
        }
        if let Some(title) = window.title {
            self.window.title = title;
        }
        if palette.seed.is_some() {
            self.palette.seed = palette.seed;
        }
        if let Some(color_space) = gpu.color_space {
            self.gpu.color_space = parse_color_space(&color_space).map_err(ConfigError::Invalid)?;
        }
        if let Some(power) = gpu.power {
            self.gpu.power = parse_gpu_power(&power).map_err(ConfigError::Invalid)?;
        }
        self.validate()
    }

    pub fn apply_cli(&mut self, args: &RunArgs) -> Result<(), ConfigError> {
        if let Some(text) = &args.text {
            self.label.text = text.clone();
        }
        if let Some(font) = &args.font {
            self.label.font = Some(font.clone());
        }
        if let Some((width, height)) = args.size {
            self.window.width = width;
            self.window.height = height;
        }
        if let Some(fps) = args.fps {
            self.window.fps = fps;
        }
        if args.seed.is_some() {
            self.palette.seed = args.seed;
        }
        if let Some(color_space) = args.color_space {
            self.gpu.color_space = color_space;
        }
        if let Some(power) = args.gpu_power {
            self.gpu.power = power;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be greater than zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if !self.window.fps.is_finite() || self.window.fps < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "fps must be zero or positive, got {}",
                self.window.fps
            )));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn into_renderer_config(self) -> RendererConfig {
        let target_fps = (self.window.fps > 0.0).then_some(self.window.fps);
        RendererConfig {
            surface_size: (self.window.width, self.window.height),
            title: self.window.title,
            label: self.label.text,
            font_path: self.label.font,
            target_fps,
            palette_seed: self.palette.seed,
            color_space: self.gpu.color_space,
            gpu_power: self.gpu.power,
        }
    }
}

/// Parses `WIDTHxHEIGHT`; `×` is accepted as the separator too.
pub fn parse_surface_size(value: &str) -> Result<(u32, u32), ConfigError> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| ConfigError::Invalid("expected WxH format, e.g. 1920x1080".to_string()))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid("invalid width in size specification".to_string()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid("invalid height in size specification".to_string()))?;

    if width == 0 || height == 0 {
        return Err(ConfigError::Invalid(
            "surface dimensions must be greater than zero".to_string(),
        ));
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_renderer_defaults() {
        let config = Settings::default().into_renderer_config();
        assert_eq!(config.surface_size, (1280, 720));
        assert_eq!(config.label, "Абоба");
        assert_eq!(config.target_fps, Some(60.0));
        assert_eq!(config.color_space, ColorSpaceMode::Auto);
    }

    #[test]
    fn file_overrides_defaults_and_cli_overrides_file() {
        let file = FileConfig::parse(
            r#"
            [label]
            text = "from file"

            [window]
            width = 640
            height = 480
            fps = 30

            [gpu]
            color_space = "linear"
            "#,
        )
        .unwrap();

        let mut settings = Settings::default();
        settings.apply_file(file).unwrap();
        assert_eq!(settings.label.text, "from file");
        assert_eq!((settings.window.width, settings.window.height), (640, 480));
        assert_eq!(settings.gpu.color_space, ColorSpaceMode::Linear);

        let args = RunArgs {
            text: Some("from cli".to_string()),
            fps: Some(0.0),
            ..RunArgs::default()
        };
        settings.apply_cli(&args).unwrap();
        assert_eq!(settings.label.text, "from cli");
        assert_eq!(settings.window.width, 640);

        let config = settings.into_renderer_config();
        assert_eq!(config.target_fps, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FileConfig::parse("[window]\ndepth = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut settings = Settings::default();
        let file = FileConfig::parse("[gpu]\npower = \"turbo\"\n").unwrap();
        assert!(matches!(settings.apply_file(file), Err(ConfigError::Invalid(_))));

        let mut settings = Settings::default();
        let file = FileConfig::parse("[window]\nfps = -1.0\n").unwrap();
        assert!(matches!(settings.apply_file(file), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn size_parsing() {
        assert_eq!(parse_surface_size("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_surface_size(" 800 X 600 ").unwrap(), (800, 600));
        assert_eq!(parse_surface_size("640×480").unwrap(), (640, 480));
        assert!(parse_surface_size("1920").is_err());
        assert!(parse_surface_size("0x1080").is_err());
        assert!(parse_surface_size("widexhigh").is_err());
    }

    #[test]
    fn rendered_toml_parses_back_as_file_config() {
        let mut settings = Settings::default();
        settings.palette.seed = Some(9);
        let rendered = settings.to_toml().unwrap();
        let file = FileConfig::parse(&rendered).unwrap();
        assert_eq!(file.palette.seed, Some(9));
        assert_eq!(file.gpu.color_space.as_deref(), Some("auto"));
        assert_eq!(file.window.fps, Some(60.0));
    }
}
