use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

use crate::settings::Settings;

const INDEX_TEMPLATE: &str = include_str!("templates/index.html.tera");

pub(crate) fn render_index_html(settings: &Settings) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("endpoint_json", &serde_json::to_string("/api/gerar-pdf")?);
    context.insert("max_photos", &settings.server.max_photos);
    context.insert("max_side", &settings.image.max_side);
    Tera::one_off(INDEX_TEMPLATE, &context, false)
        .with_context(|| "failed to render index template")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_page_mentions_photo_limit() {
        let mut settings = Settings::default();
        settings.server.max_photos = 12;
        let html = render_index_html(&settings).expect("render");
        assert!(html.contains("\"/api/gerar-pdf\""));
        assert!(html.contains("12"));
    }
}
