pub const PT_TO_MM: f32 = 0.352_778;
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor { r: 0, g: 0, b: 0 };

    /// Parses `#rrggbb` or `rrggbb`.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

/// Every styling constant of the report in one place. Lengths are
/// millimetres, font sizes are points.
#[derive(Debug, Clone)]
pub struct LayoutStyle {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,

    /// Fixed header text. When unset the report title is used instead and no
    /// separate title block is emitted.
    pub heading: Option<String>,
    pub heading_font_size: f32,
    pub heading_color: RgbColor,
    pub logo_size: f32,
    pub header_gap: f32,

    /// Number of parallel rules under the header (1 or 3).
    pub separator_rules: usize,
    pub separator_color: RgbColor,
    pub separator_thickness: f32,
    pub separator_spacing: f32,
    pub separator_gap: f32,

    pub metadata_font_size: f32,
    pub metadata_color: RgbColor,
    pub metadata_gap: f32,

    pub title_font_size: f32,
    pub title_color: RgbColor,

    pub image_width: f32,
    pub image_height: f32,
    pub image_column_width: f32,
    pub cell_padding: f32,
    pub caption_font_size: f32,
    pub caption_leading: f32,
    pub caption_color: RgbColor,
    pub placeholder_caption: String,

    pub row_gap_before: f32,
    pub divider_color: RgbColor,
    pub divider_thickness: f32,
    pub row_gap_after: f32,
    pub trailing_gap: f32,

    pub footer_offset: f32,
    pub footer_font_size: f32,
    pub footer_page_template: String,
    pub footer_label_template: String,
    pub default_issuer: String,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH_MM,
            page_height: A4_HEIGHT_MM,
            margin_top: 20.0,
            margin_bottom: 30.0,
            margin_left: 20.0,
            margin_right: 20.0,
            heading: None,
            heading_font_size: 18.0,
            heading_color: RgbColor { r: 0x1e, g: 0x29, b: 0x3b },
            logo_size: 25.0,
            header_gap: 3.0,
            separator_rules: 1,
            separator_color: RgbColor { r: 0x1e, g: 0x5b, b: 0xa8 },
            separator_thickness: 0.5,
            separator_spacing: 1.0,
            separator_gap: 5.0,
            metadata_font_size: 11.0,
            metadata_color: RgbColor { r: 0x55, g: 0x55, b: 0x55 },
            metadata_gap: 5.0,
            title_font_size: 16.0,
            title_color: RgbColor { r: 0x2c, g: 0x3e, b: 0x50 },
            image_width: 80.0,
            image_height: 60.0,
            image_column_width: 85.0,
            cell_padding: 1.8,
            caption_font_size: 10.0,
            caption_leading: 14.0,
            caption_color: RgbColor { r: 0x1a, g: 0x1a, b: 0x1a },
            placeholder_caption: "Sem observações".to_string(),
            row_gap_before: 3.0,
            divider_color: RgbColor { r: 0xe2, g: 0xe8, b: 0xf0 },
            divider_thickness: 0.2,
            row_gap_after: 5.0,
            trailing_gap: 8.0,
            footer_offset: 15.0,
            footer_font_size: 8.0,
            footer_page_template: "Página {page} de {total}".to_string(),
            footer_label_template: "Relatório emitido por: {issuer}".to_string(),
            default_issuer: "Sistema".to_string(),
        }
    }
}

impl LayoutStyle {
    pub fn content_width(&self) -> f32 {
        (self.page_width - self.margin_left - self.margin_right).max(1.0)
    }

    /// Distance from the top edge below which content must not be placed.
    pub fn content_bottom(&self) -> f32 {
        self.page_height - self.margin_bottom
    }

    pub fn page_label(&self, page: usize, total: usize) -> String {
        self.footer_page_template
            .replace("{page}", &page.to_string())
            .replace("{total}", &total.to_string())
    }

    pub fn footer_label(&self, issuer: Option<&str>) -> String {
        let issuer = issuer
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.default_issuer.as_str());
        self.footer_label_template.replace("{issuer}", issuer)
    }
}

pub fn pt_to_mm(pt: f32) -> f32 {
    pt * PT_TO_MM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(
            RgbColor::parse_hex("#1e5ba8"),
            Some(RgbColor { r: 0x1e, g: 0x5b, b: 0xa8 })
        );
        assert_eq!(
            RgbColor::parse_hex("E2E8F0"),
            Some(RgbColor { r: 0xe2, g: 0xe8, b: 0xf0 })
        );
        assert_eq!(RgbColor::parse_hex("#12345"), None);
        assert_eq!(RgbColor::parse_hex("#gg0000"), None);
    }

    #[test]
    fn footer_texts_follow_templates() {
        let style = LayoutStyle::default();
        assert_eq!(style.page_label(2, 7), "Página 2 de 7");
        assert_eq!(
            style.footer_label(Some("Trivia Trens")),
            "Relatório emitido por: Trivia Trens"
        );
        assert_eq!(style.footer_label(Some("  ")), "Relatório emitido por: Sistema");
        assert_eq!(style.footer_label(None), "Relatório emitido por: Sistema");
    }

    #[test]
    fn content_area_of_default_a4() {
        let style = LayoutStyle::default();
        assert!((style.content_width() - 170.0).abs() < f32::EPSILON);
        assert!((style.content_bottom() - 267.0).abs() < f32::EPSILON);
    }
}
