use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::normalize::{self, NormalizeOptions, NormalizedImage};
use crate::settings::PathSettings;

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Creates the uploads and assets directories if they are missing.
pub fn prepare(paths: &PathSettings) -> Result<()> {
    for dir in [&paths.uploads_dir, &paths.assets_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }
    Ok(())
}

pub fn is_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

pub fn logo_exists(paths: &PathSettings) -> bool {
    paths.logo.is_file()
}

/// Path of the logo if it exists and has an accepted raster extension.
pub fn logo_path(paths: &PathSettings) -> Option<PathBuf> {
    let path = &paths.logo;
    if !path.is_file() {
        return None;
    }
    if !is_allowed_extension(path) {
        warn!("ignoring logo with unsupported extension: {}", path.display());
        return None;
    }
    Some(path.clone())
}

/// Reads and normalizes the logo. A broken logo only costs the header its image.
pub fn load_logo(paths: &PathSettings, options: &NormalizeOptions) -> Option<Arc<NormalizedImage>> {
    let path = logo_path(paths)?;
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("failed to read logo {}: {}", path.display(), err);
            return None;
        }
    };
    match normalize::normalize_bytes(&bytes, options) {
        Ok(image) => Some(Arc::new(image)),
        Err(err) => {
            warn!("failed to load logo {}: {}", path.display(), err);
            None
        }
    }
}

pub fn log_startup(paths: &PathSettings) {
    if logo_path(paths).is_none() {
        info!(
            "no logo found; place the company logo at {} (png, jpg, jpeg or webp)",
            paths.logo.display()
        );
    }
}
