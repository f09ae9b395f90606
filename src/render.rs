use image::ImageFormat;
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageFilter, ImageTransform, ImageXObject,
    IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Polygon,
    PolygonMode, Px, Rgb, WindingOrder,
};
use std::io::{BufWriter, Cursor};
use thiserror::Error;
use tracing::debug;

use crate::compose::LayoutBlock;
use crate::layout::fonts::{FontSet, FontSource, FontWeight};
use crate::layout::paginate::{ImageBox, PageLayout, PlacedItem, RuleBox, TextRun, paginate};
use crate::layout::style::{LayoutStyle, RgbColor};

/// Resolution used to size embedded images; the transform scales them to their box anyway.
const IMAGE_DPI: f32 = 300.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to register font: {0}")]
    Font(String),
    #[error("failed to embed image on page {page}: {reason}")]
    Image { page: usize, reason: String },
    #[error("failed to write pdf: {0}")]
    Write(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    pub page: usize,
    pub total: usize,
    pub label: String,
    pub page_label: String,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Footer of every page. `total` is only known once the layout pass is complete.
pub fn footers(pages: &[PageLayout], label: &str, style: &LayoutStyle) -> Vec<Footer> {
    let total = pages.len();
    pages
        .iter()
        .map(|page| Footer {
            page: page.number,
            total,
            label: label.to_string(),
            page_label: style.page_label(page.number, total),
        })
        .collect()
}

/// Lays the blocks out, then draws every page together with its footer.
pub fn render(
    title: &str,
    blocks: &[LayoutBlock],
    footer_label: &str,
    style: &LayoutStyle,
    fonts: &FontSet,
) -> Result<RenderedDocument, RenderError> {
    let pages = paginate(blocks, style, fonts);
    debug!("layout produced {} page(s)", pages.len());
    finalize(title, &pages, footer_label, style, fonts)
}

pub fn finalize(
    title: &str,
    pages: &[PageLayout],
    footer_label: &str,
    style: &LayoutStyle,
    fonts: &FontSet,
) -> Result<RenderedDocument, RenderError> {
    let page_width = Mm(style.page_width);
    let page_height = Mm(style.page_height);
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, page_width, page_height, "Layer 1");
    let pdf_fonts = PdfFonts::register(&doc, fonts)?;
    let footers = footers(pages, footer_label, style);

    for (index, (page, footer)) in pages.iter().zip(footers.iter()).enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) = doc.add_page(page_width, page_height, "Layer 1");
            doc.get_page(page_index).get_layer(layer_index)
        };
        let canvas = Canvas {
            layer,
            fonts: &pdf_fonts,
            metrics: fonts,
            style,
        };
        debug!(
            "drawing page {}/{} with {} photo row(s)",
            footer.page, footer.total, page.photo_rows
        );
        for item in &page.items {
            match item {
                PlacedItem::Text(run) => canvas.text(run),
                PlacedItem::Rule(rule) => canvas.rule(rule),
                PlacedItem::Image(image) => canvas.image(image, page.number)?,
            }
        }
        canvas.footer(footer);
    }

    let mut bytes = Vec::new();
    {
        let mut writer = BufWriter::new(Cursor::new(&mut bytes));
        doc.save(&mut writer)
            .map_err(|err| RenderError::Write(err.to_string()))?;
    }
    Ok(RenderedDocument {
        bytes,
        pages: pages.len(),
    })
}

struct PdfFonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl PdfFonts {
    fn register(doc: &PdfDocumentReference, fonts: &FontSet) -> Result<Self, RenderError> {
        Ok(Self {
            regular: register_font(doc, &fonts.regular, BuiltinFont::Helvetica)?,
            bold: register_font(doc, &fonts.bold, BuiltinFont::HelveticaBold)?,
        })
    }

    fn get(&self, weight: FontWeight) -> &IndirectFontRef {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }
}

fn register_font(
    doc: &PdfDocumentReference,
    source: &FontSource,
    builtin: BuiltinFont,
) -> Result<IndirectFontRef, RenderError> {
    let result = match source {
        FontSource::Builtin(_) => doc.add_builtin_font(builtin),
        FontSource::External(font) => doc.add_external_font(Cursor::new(font.data())),
    };
    result.map_err(|err| RenderError::Font(err.to_string()))
}

struct Canvas<'a> {
    layer: PdfLayerReference,
    fonts: &'a PdfFonts,
    metrics: &'a FontSet,
    style: &'a LayoutStyle,
}

impl Canvas<'_> {
    /// Converts a distance from the top edge to PDF's bottom-up coordinate.
    fn y(&self, from_top: f32) -> Mm {
        Mm(self.style.page_height - from_top)
    }

    fn text(&self, run: &TextRun) {
        if run.text.is_empty() {
            return;
        }
        self.layer.set_fill_color(color(run.color));
        self.layer.use_text(
            run.text.as_str(),
            run.size,
            Mm(run.x),
            self.y(run.baseline),
            self.fonts.get(run.weight),
        );
    }

    fn rule(&self, rule: &RuleBox) {
        let left = Mm(rule.x);
        let right = Mm(rule.x + rule.width);
        let top = self.y(rule.top);
        let bottom = self.y(rule.top + rule.height);
        let points = vec![
            (Point::new(left, bottom), false),
            (Point::new(right, bottom), false),
            (Point::new(right, top), false),
            (Point::new(left, top), false),
        ];
        self.layer.set_fill_color(color(rule.color));
        self.layer.add_polygon(Polygon {
            rings: vec![points],
            mode: PolygonMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
    }

    /// Embeds the normalized JPEG as-is behind a DCTDecode filter.
    fn image(&self, placed: &ImageBox, page: usize) -> Result<(), RenderError> {
        let image = &placed.image;
        match image::guess_format(&image.bytes) {
            Ok(ImageFormat::Jpeg) => {}
            _ => {
                return Err(RenderError::Image {
                    page,
                    reason: "embedded image is not a JPEG stream".to_string(),
                });
            }
        }
        if image.width == 0 || image.height == 0 {
            return Err(RenderError::Image {
                page,
                reason: "image has no pixels".to_string(),
            });
        }
        let natural_width = px_to_mm(image.width);
        let natural_height = px_to_mm(image.height);
        let transform = ImageTransform {
            translate_x: Some(Mm(placed.x)),
            translate_y: Some(self.y(placed.top + placed.height)),
            rotate: None,
            scale_x: Some(placed.width / natural_width),
            scale_y: Some(placed.height / natural_height),
            dpi: Some(IMAGE_DPI),
        };
        let xobject = ImageXObject {
            width: Px(image.width as usize),
            height: Px(image.height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: image.bytes.clone(),
            image_filter: Some(ImageFilter::DCT),
            clipping_bbox: None,
        };
        Image::from(xobject).add_to_layer(self.layer.clone(), transform);
        Ok(())
    }

    fn footer(&self, footer: &Footer) {
        let size = self.style.footer_font_size;
        let baseline = Mm(self.style.footer_offset);
        let font = self.fonts.get(FontWeight::Regular);
        self.layer.set_fill_color(color(RgbColor::BLACK));
        if !footer.label.is_empty() {
            self.layer.use_text(
                footer.label.as_str(),
                size,
                Mm(self.style.margin_left),
                baseline,
                font,
            );
        }
        let width = self
            .metrics
            .text_width(FontWeight::Regular, &footer.page_label, size);
        let right = self.style.page_width - self.style.margin_right;
        self.layer
            .use_text(footer.page_label.as_str(), size, Mm(right - width), baseline, font);
    }
}

fn color(value: RgbColor) -> Color {
    let (r, g, b) = value.to_unit();
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn px_to_mm(px: u32) -> f32 {
    px as f32 / IMAGE_DPI * 25.4
}
