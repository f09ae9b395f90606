use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub mod compose;
pub mod layout;
pub mod logging;
pub mod normalize;
pub mod render;
pub mod report;
pub mod server;
pub mod settings;
#[cfg(test)]
mod test_util;
pub mod workspace;

pub use layout::fonts::FontSet;
pub use report::{PhotoEntry, ReportRequest, ValidationError};
pub use settings::Settings;

/// A finished report ready to be sent or written out.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub pdf: Vec<u8>,
    pub pages: usize,
    pub embedded: usize,
    pub skipped: usize,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Render(#[from] render::RenderError),
}

impl ReportError {
    /// Short error category reported to HTTP clients.
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::Validation(_) => "ValidationError",
            ReportError::Render(render::RenderError::Font(_)) => "FontError",
            ReportError::Render(render::RenderError::Image { .. }) => "ImageError",
            ReportError::Render(render::RenderError::Write(_)) => "WriteError",
        }
    }
}

pub fn generate_report(
    request: &ReportRequest,
    settings: &Settings,
    fonts: &FontSet,
) -> Result<RenderedReport, ReportError> {
    request.validate(settings.server.max_photos)?;
    let logo = workspace::load_logo(&settings.paths, &settings.image);
    let composition = compose::compose(request, &settings.layout, &settings.image, logo);
    let title = request.title.as_deref().unwrap_or_default();
    let footer_label = settings.layout.footer_label(request.issuer.as_deref());
    let document = render::render(
        title,
        &composition.blocks,
        &footer_label,
        &settings.layout,
        fonts,
    )?;
    info!(
        "generated report: {} page(s), {} photo(s), {} skipped",
        document.pages, composition.embedded, composition.skipped
    );
    Ok(RenderedReport {
        pdf: document.bytes,
        pages: document.pages,
        embedded: composition.embedded,
        skipped: composition.skipped,
    })
}

/// Renders a JSON request file into a PDF on disk.
pub fn render_file(input: &Path, output: &Path, settings: &Settings) -> Result<RenderedReport> {
    let body = fs::read(input)
        .with_context(|| format!("failed to read request: {}", input.display()))?;
    let request = ReportRequest::from_json(&body)?;
    let fonts = load_fonts(settings)?;
    let report = generate_report(&request, settings, &fonts)?;

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(&report.pdf)
        .with_context(|| "failed to write pdf")?;
    tmp.persist(output)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to write pdf: {}", output.display()))?;
    Ok(report)
}

pub fn load_fonts(settings: &Settings) -> Result<FontSet> {
    FontSet::load(
        settings.fonts.regular.as_deref(),
        settings.fonts.bold.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::request_with_photos;
    use tempfile::tempdir;

    fn isolated_settings(root: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.paths.logo = root.join("assets").join("logo.png");
        settings.paths.uploads_dir = root.join("temp_uploads");
        settings.paths.assets_dir = root.join("assets");
        settings
    }

    #[test]
    fn validation_runs_before_rendering() {
        let dir = tempdir().expect("tempdir");
        let settings = isolated_settings(dir.path());
        let err = generate_report(&request_with_photos(0), &settings, &FontSet::default())
            .expect_err("should fail");
        assert!(matches!(
            err,
            ReportError::Validation(ValidationError::NoPhotos)
        ));
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn writes_pdf_file() {
        let dir = tempdir().expect("tempdir");
        let settings = isolated_settings(dir.path());
        let input = dir.path().join("request.json");
        let output = dir.path().join("out").join("report.pdf");
        fs::write(
            &input,
            serde_json::to_vec(&request_with_photos(3)).expect("json"),
        )
        .expect("write request");

        let report = render_file(&input, &output, &settings).expect("render");
        assert_eq!(report.pages, 2);
        assert_eq!(report.embedded, 3);
        let bytes = fs::read(&output).expect("read pdf");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
