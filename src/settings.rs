use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::layout::style::{LayoutStyle, RgbColor};
use crate::normalize::NormalizeOptions;
use crate::report::MAX_PHOTOS;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub paths: PathSettings,
    pub image: NormalizeOptions,
    pub layout: LayoutStyle,
    pub fonts: FontSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub body_limit_mb: usize,
    pub max_photos: usize,
}

#[derive(Debug, Clone)]
pub struct PathSettings {
    pub logo: PathBuf,
    pub uploads_dir: PathBuf,
    pub assets_dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct FontSettings {
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 5000,
                debug: false,
                body_limit_mb: 50,
                max_photos: MAX_PHOTOS,
            },
            paths: PathSettings {
                logo: PathBuf::from("assets/logo.png"),
                uploads_dir: PathBuf::from("temp_uploads"),
                assets_dir: PathBuf::from("assets"),
            },
            image: NormalizeOptions::default(),
            layout: LayoutStyle::default(),
            fonts: FontSettings::default(),
        }
    }
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    server: Option<ServerFile>,
    paths: Option<PathsFile>,
    image: Option<ImageFile>,
    layout: Option<LayoutFile>,
    fonts: Option<FontsFile>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerFile {
    host: Option<String>,
    port: Option<u16>,
    debug: Option<bool>,
    body_limit_mb: Option<usize>,
    max_photos: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PathsFile {
    logo: Option<String>,
    uploads_dir: Option<String>,
    assets_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageFile {
    max_side: Option<u32>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct FontsFile {
    regular: Option<String>,
    bold: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LayoutFile {
    page_width: Option<f32>,
    page_height: Option<f32>,
    margin_top: Option<f32>,
    margin_bottom: Option<f32>,
    margin_left: Option<f32>,
    margin_right: Option<f32>,
    heading: Option<String>,
    heading_font_size: Option<f32>,
    heading_color: Option<String>,
    logo_size: Option<f32>,
    header_gap: Option<f32>,
    separator_rules: Option<usize>,
    separator_color: Option<String>,
    separator_thickness: Option<f32>,
    separator_spacing: Option<f32>,
    separator_gap: Option<f32>,
    metadata_font_size: Option<f32>,
    metadata_color: Option<String>,
    metadata_gap: Option<f32>,
    title_font_size: Option<f32>,
    title_color: Option<String>,
    image_width: Option<f32>,
    image_height: Option<f32>,
    image_column_width: Option<f32>,
    cell_padding: Option<f32>,
    caption_font_size: Option<f32>,
    caption_leading: Option<f32>,
    caption_color: Option<String>,
    placeholder_caption: Option<String>,
    row_gap_before: Option<f32>,
    divider_color: Option<String>,
    divider_thickness: Option<f32>,
    row_gap_after: Option<f32>,
    trailing_gap: Option<f32>,
    footer_offset: Option<f32>,
    footer_font_size: Option<f32>,
    footer_page_template: Option<String>,
    footer_label_template: Option<String>,
    default_issuer: Option<String>,
}

/// Built-in defaults, then `settings.toml` and `settings.local.toml` from the
/// working directory, then `extra_path`. Later files win field by field.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse built-in settings")?;
    settings.merge(defaults)?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            settings.merge_file(&path)?;
        }
    }
    Ok(settings)
}

impl Settings {
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        let parsed: SettingsFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        self.merge(parsed)
            .with_context(|| format!("invalid settings: {}", path.display()))
    }

    /// Applies `PORT` and `DEBUG` overrides.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            let port = port.trim();
            if !port.is_empty() {
                self.server.port = port
                    .parse()
                    .with_context(|| format!("invalid PORT value: {}", port))?;
            }
        }
        if let Some(debug) = lookup("DEBUG") {
            self.server.debug = debug.trim().eq_ignore_ascii_case("true");
        }
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(server) = incoming.server {
            if let Some(host) = non_blank(server.host) {
                self.server.host = host;
            }
            set(&mut self.server.port, server.port);
            set(&mut self.server.debug, server.debug);
            set(&mut self.server.body_limit_mb, server.body_limit_mb.filter(|mb| *mb > 0));
            set(&mut self.server.max_photos, server.max_photos.filter(|max| *max > 0));
        }
        if let Some(paths) = incoming.paths {
            set(&mut self.paths.logo, non_blank(paths.logo).map(PathBuf::from));
            set(&mut self.paths.uploads_dir, non_blank(paths.uploads_dir).map(PathBuf::from));
            set(&mut self.paths.assets_dir, non_blank(paths.assets_dir).map(PathBuf::from));
        }
        if let Some(image) = incoming.image {
            set(&mut self.image.max_side, image.max_side.filter(|side| *side > 0));
            if let Some(quality) = image.jpeg_quality {
                if !(1..=100).contains(&quality) {
                    return Err(anyhow!("jpeg_quality must be within 1..=100"));
                }
                self.image.jpeg_quality = quality;
            }
        }
        if let Some(layout) = incoming.layout {
            self.merge_layout(layout)?;
        }
        if let Some(fonts) = incoming.fonts {
            if let Some(path) = non_blank(fonts.regular) {
                self.fonts.regular = Some(PathBuf::from(path));
            }
            if let Some(path) = non_blank(fonts.bold) {
                self.fonts.bold = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    fn merge_layout(&mut self, file: LayoutFile) -> Result<()> {
        let layout = &mut self.layout;
        set_length(&mut layout.page_width, file.page_width);
        set_length(&mut layout.page_height, file.page_height);
        set_length(&mut layout.margin_top, file.margin_top);
        set_length(&mut layout.margin_bottom, file.margin_bottom);
        set_length(&mut layout.margin_left, file.margin_left);
        set_length(&mut layout.margin_right, file.margin_right);
        if let Some(heading) = file.heading {
            layout.heading = Some(heading).filter(|value| !value.trim().is_empty());
        }
        set_length(&mut layout.heading_font_size, file.heading_font_size);
        set_color(&mut layout.heading_color, file.heading_color)?;
        set_length(&mut layout.logo_size, file.logo_size);
        set_length(&mut layout.header_gap, file.header_gap);
        if let Some(rules) = file.separator_rules {
            if rules != 1 && rules != 3 {
                return Err(anyhow!("separator_rules must be 1 or 3 (got {})", rules));
            }
            layout.separator_rules = rules;
        }
        set_color(&mut layout.separator_color, file.separator_color)?;
        set_length(&mut layout.separator_thickness, file.separator_thickness);
        set_length(&mut layout.separator_spacing, file.separator_spacing);
        set_length(&mut layout.separator_gap, file.separator_gap);
        set_length(&mut layout.metadata_font_size, file.metadata_font_size);
        set_color(&mut layout.metadata_color, file.metadata_color)?;
        set_length(&mut layout.metadata_gap, file.metadata_gap);
        set_length(&mut layout.title_font_size, file.title_font_size);
        set_color(&mut layout.title_color, file.title_color)?;
        set_length(&mut layout.image_width, file.image_width);
        set_length(&mut layout.image_height, file.image_height);
        set_length(&mut layout.image_column_width, file.image_column_width);
        set_length(&mut layout.cell_padding, file.cell_padding);
        set_length(&mut layout.caption_font_size, file.caption_font_size);
        set_length(&mut layout.caption_leading, file.caption_leading);
        set_color(&mut layout.caption_color, file.caption_color)?;
        set(&mut layout.placeholder_caption, non_blank(file.placeholder_caption));
        set_length(&mut layout.row_gap_before, file.row_gap_before);
        set_color(&mut layout.divider_color, file.divider_color)?;
        set_length(&mut layout.divider_thickness, file.divider_thickness);
        set_length(&mut layout.row_gap_after, file.row_gap_after);
        set_length(&mut layout.trailing_gap, file.trailing_gap);
        set_length(&mut layout.footer_offset, file.footer_offset);
        set_length(&mut layout.footer_font_size, file.footer_font_size);
        set(&mut layout.footer_page_template, non_blank(file.footer_page_template));
        set(&mut layout.footer_label_template, file.footer_label_template);
        set(&mut layout.default_issuer, non_blank(file.default_issuer));

        if layout.margin_top + layout.margin_bottom >= layout.page_height
            || layout.margin_left + layout.margin_right >= layout.page_width
        {
            return Err(anyhow!("page margins leave no room for content"));
        }
        Ok(())
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Lengths and sizes must be finite and non-negative.
fn set_length(target: &mut f32, value: Option<f32>) {
    set(target, value.filter(|v| v.is_finite() && *v >= 0.0));
}

fn set_color(target: &mut RgbColor, value: Option<String>) -> Result<()> {
    if let Some(raw) = non_blank(value) {
        *target = RgbColor::parse_hex(&raw).ok_or_else(|| anyhow!("invalid color: {}", raw))?;
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
