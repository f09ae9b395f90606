use std::sync::Arc;

use super::fonts::{FontSet, FontWeight, wrap_text};
use super::style::{LayoutStyle, RgbColor, pt_to_mm};
use crate::compose::{HeaderBlock, LayoutBlock, MetadataLine, PhotoRow, SeparatorLine};
use crate::normalize::NormalizedImage;

/// Share of the font size above the baseline.
const ASCENT: f32 = 0.8;
const LINE_SPACING: f32 = 1.2;

#[derive(Debug, Clone)]
pub struct TextRun {
    pub x: f32,
    /// Baseline, measured from the top edge of the page.
    pub baseline: f32,
    pub size: f32,
    pub weight: FontWeight,
    pub color: RgbColor,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct RuleBox {
    pub x: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub color: RgbColor,
}

#[derive(Debug, Clone)]
pub struct ImageBox {
    pub x: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub image: Arc<NormalizedImage>,
}

/// Content with resolved page coordinates (millimetres from the top-left corner).
#[derive(Debug, Clone)]
pub enum PlacedItem {
    Text(TextRun),
    Rule(RuleBox),
    Image(ImageBox),
}

impl PlacedItem {
    fn shift_down(&mut self, dy: f32) {
        match self {
            PlacedItem::Text(run) => run.baseline += dy,
            PlacedItem::Rule(rule) => rule.top += dy,
            PlacedItem::Image(image) => image.top += dy,
        }
    }

    /// Highest point of the item, from the top edge.
    pub fn top(&self) -> f32 {
        match self {
            PlacedItem::Text(run) => run.baseline - pt_to_mm(run.size) * ASCENT,
            PlacedItem::Rule(rule) => rule.top,
            PlacedItem::Image(image) => image.top,
        }
    }

    /// Lowest point of the item, from the top edge.
    pub fn bottom(&self) -> f32 {
        match self {
            PlacedItem::Text(run) => run.baseline + pt_to_mm(run.size) * (1.0 - ASCENT),
            PlacedItem::Rule(rule) => rule.top + rule.height,
            PlacedItem::Image(image) => image.top + image.height,
        }
    }
}

/// Result of the layout pass for one page. Immutable once produced.
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// 1-based position in the document.
    pub number: usize,
    pub items: Vec<PlacedItem>,
    pub photo_rows: usize,
}

impl PageLayout {
    pub fn text(&self) -> impl Iterator<Item = &TextRun> {
        self.items.iter().filter_map(|item| match item {
            PlacedItem::Text(run) => Some(run),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageBox> {
        self.items.iter().filter_map(|item| match item {
            PlacedItem::Image(image) => Some(image),
            _ => None,
        })
    }
}

struct Measured {
    height: f32,
    items: Vec<PlacedItem>,
}

struct PageBuilder<'a> {
    style: &'a LayoutStyle,
    pages: Vec<PageLayout>,
    items: Vec<PlacedItem>,
    photo_rows: usize,
    cursor: f32,
}

impl<'a> PageBuilder<'a> {
    fn new(style: &'a LayoutStyle) -> Self {
        Self {
            style,
            pages: Vec::new(),
            items: Vec::new(),
            photo_rows: 0,
            cursor: style.margin_top,
        }
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn remaining(&self) -> f32 {
        self.style.content_bottom() - self.cursor
    }

    fn close_page(&mut self) {
        let number = self.pages.len() + 1;
        self.pages.push(PageLayout {
            number,
            items: std::mem::take(&mut self.items),
            photo_rows: std::mem::take(&mut self.photo_rows),
        });
        self.cursor = self.style.margin_top;
    }

    fn place(&mut self, measured: Measured, is_row: bool) {
        if measured.height > self.remaining() && !self.is_empty() {
            self.close_page();
        }
        if measured.height > self.remaining() {
            self.place_split(measured);
            return;
        }
        let top = self.cursor;
        self.items.extend(measured.items.into_iter().map(|mut item| {
            item.shift_down(top);
            item
        }));
        if is_row {
            self.photo_rows += 1;
        }
        self.cursor += measured.height;
    }

    /// Flows a block taller than a whole page item by item, moving whatever
    /// crosses the bottom margin to the top of a fresh page.
    fn place_split(&mut self, measured: Measured) {
        let mut items = measured.items;
        items.sort_by(|a, b| a.top().total_cmp(&b.top()));
        let mut offset = self.cursor;
        for mut item in items {
            item.shift_down(offset);
            if item.bottom() > self.style.content_bottom() && !self.is_empty() {
                let lift = item.top() - self.style.margin_top;
                self.close_page();
                offset -= lift;
                item.shift_down(-lift);
            }
            self.items.push(item);
        }
        self.cursor = offset + measured.height;
    }

    fn finish(mut self) -> Vec<PageLayout> {
        if !self.is_empty() || self.pages.is_empty() {
            self.close_page();
        }
        self.pages
    }
}

/// Layout pass: flows blocks onto pages. Always yields at least one page.
pub fn paginate(blocks: &[LayoutBlock], style: &LayoutStyle, fonts: &FontSet) -> Vec<PageLayout> {
    let mut builder = PageBuilder::new(style);
    for block in blocks {
        match block {
            LayoutBlock::PageBreak => {
                if !builder.is_empty() {
                    builder.close_page();
                }
            }
            LayoutBlock::Spacer(height) => {
                if builder.is_empty() {
                    continue;
                }
                if *height > builder.remaining() {
                    builder.close_page();
                } else {
                    builder.cursor += height.max(0.0);
                }
            }
            LayoutBlock::Header(header) => builder.place(measure_header(header, style, fonts), false),
            LayoutBlock::Separator(line) => builder.place(measure_separator(line, style), false),
            LayoutBlock::Metadata(line) => builder.place(measure_metadata(line, style, fonts), false),
            LayoutBlock::Title(title) => builder.place(measure_title(title, style, fonts), false),
            LayoutBlock::PhotoRow(row) => builder.place(measure_photo_row(row, style, fonts), true),
        }
    }
    builder.finish()
}

fn line_height(size: f32) -> f32 {
    pt_to_mm(size * LINE_SPACING)
}

/// Scales `image` to fit inside `max_width` x `max_height`, never distorting it.
fn fit_box(image: &NormalizedImage, max_width: f32, max_height: f32) -> (f32, f32) {
    let aspect = image.aspect_ratio();
    if max_width / max_height > aspect {
        (max_height * aspect, max_height)
    } else {
        (max_width, max_width / aspect)
    }
}

fn measure_header(header: &HeaderBlock, style: &LayoutStyle, fonts: &FontSet) -> Measured {
    let padding = style.cell_padding;
    let width = style.content_width();
    let logo_cell = header
        .logo
        .as_ref()
        .map(|_| (style.logo_size + 2.0 * padding).min(width / 2.0))
        .unwrap_or(0.0);
    let title_cell = width - logo_cell;
    let size = style.heading_font_size;
    let lines = wrap_text(
        fonts,
        FontWeight::Bold,
        &header.heading,
        size,
        (title_cell - 2.0 * padding).max(1.0),
    );
    let text_height = lines.len() as f32 * line_height(size);
    let logo_dims = header
        .logo
        .as_ref()
        .map(|logo| fit_box(logo, style.logo_size, style.logo_size));
    let logo_height = logo_dims.map(|(_, h)| h).unwrap_or(0.0);
    let height = text_height.max(logo_height) + 2.0 * padding;

    let mut items = Vec::new();
    let text_top = (height - text_height) / 2.0;
    for (index, line) in lines.into_iter().enumerate() {
        items.push(PlacedItem::Text(TextRun {
            x: style.margin_left + padding,
            baseline: text_top + index as f32 * line_height(size) + pt_to_mm(size) * ASCENT,
            size,
            weight: FontWeight::Bold,
            color: style.heading_color,
            text: line,
        }));
    }
    if let (Some(logo), Some((logo_width, logo_height))) = (header.logo.as_ref(), logo_dims) {
        items.push(PlacedItem::Image(ImageBox {
            x: style.margin_left + width - padding - logo_width,
            top: (height - logo_height) / 2.0,
            width: logo_width,
            height: logo_height,
            image: Arc::clone(logo),
        }));
    }
    Measured { height, items }
}

fn measure_separator(line: &SeparatorLine, style: &LayoutStyle) -> Measured {
    let rules = line.rules.max(1);
    let mut items = Vec::with_capacity(rules);
    let mut top = 0.0;
    for index in 0..rules {
        if index > 0 {
            top += style.separator_spacing;
        }
        items.push(PlacedItem::Rule(RuleBox {
            x: style.margin_left,
            top,
            width: style.content_width(),
            height: line.thickness,
            color: line.color,
        }));
        top += line.thickness;
    }
    Measured { height: top, items }
}

fn measure_metadata(line: &MetadataLine, style: &LayoutStyle, fonts: &FontSet) -> Measured {
    let size = style.metadata_font_size;
    let width = style.content_width();
    let center = style.margin_left + width / 2.0;
    let label_width = fonts.text_width(FontWeight::Bold, &line.label, size);
    let space_width = fonts.text_width(FontWeight::Regular, " ", size);
    let available = (width - label_width - space_width).max(width / 3.0);
    let mut values = wrap_text(fonts, FontWeight::Regular, &line.value, size, available);
    if values.is_empty() {
        values.push(String::new());
    }

    let mut items = Vec::new();
    for (index, value) in values.iter().enumerate() {
        let baseline = index as f32 * line_height(size) + pt_to_mm(size) * ASCENT;
        let value_width = fonts.text_width(FontWeight::Regular, value, size);
        if index == 0 {
            let total = label_width + space_width + value_width;
            let start = center - total / 2.0;
            items.push(PlacedItem::Text(TextRun {
                x: start,
                baseline,
                size,
                weight: FontWeight::Bold,
                color: style.metadata_color,
                text: line.label.clone(),
            }));
            items.push(PlacedItem::Text(TextRun {
                x: start + label_width + space_width,
                baseline,
                size,
                weight: FontWeight::Regular,
                color: style.metadata_color,
                text: value.clone(),
            }));
        } else {
            items.push(PlacedItem::Text(TextRun {
                x: center - value_width / 2.0,
                baseline,
                size,
                weight: FontWeight::Regular,
                color: style.metadata_color,
                text: value.clone(),
            }));
        }
    }
    let height = values.len() as f32 * line_height(size) + pt_to_mm(size * 0.5);
    Measured { height, items }
}

fn measure_title(title: &str, style: &LayoutStyle, fonts: &FontSet) -> Measured {
    let size = style.title_font_size;
    let width = style.content_width();
    let center = style.margin_left + width / 2.0;
    let space_before = pt_to_mm(size * 0.625);
    let space_after = pt_to_mm(size * 1.25);
    let lines = wrap_text(fonts, FontWeight::Bold, title, size, width);
    let items = lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let line_width = fonts.text_width(FontWeight::Bold, line, size);
            PlacedItem::Text(TextRun {
                x: center - line_width / 2.0,
                baseline: space_before + index as f32 * line_height(size) + pt_to_mm(size) * ASCENT,
                size,
                weight: FontWeight::Bold,
                color: style.title_color,
                text: line.clone(),
            })
        })
        .collect();
    let height = space_before + lines.len() as f32 * line_height(size) + space_after;
    Measured { height, items }
}

fn measure_photo_row(row: &PhotoRow, style: &LayoutStyle, fonts: &FontSet) -> Measured {
    let padding = style.cell_padding;
    let width = style.content_width();
    let image_column = style.image_column_width.min(width - 2.0 * padding).max(1.0);
    let caption_column = (width - image_column).max(1.0);
    let (image_width, image_height) = fit_box(
        &row.image,
        style.image_width.min(image_column - 2.0 * padding).max(1.0),
        style.image_height,
    );

    let size = style.caption_font_size;
    let leading = pt_to_mm(style.caption_leading);
    let mut lines = wrap_text(
        fonts,
        FontWeight::Regular,
        &row.caption,
        size,
        (caption_column - 2.0 * padding).max(1.0),
    );
    // A row never spans pages; extra caption lines beyond one page are dropped.
    let page_room = style.content_bottom() - style.margin_top - 2.0 * padding;
    let max_lines = ((page_room / leading).floor() as usize).max(1);
    lines.truncate(max_lines);
    let caption_height = lines.len() as f32 * leading;

    let mut items = vec![PlacedItem::Image(ImageBox {
        x: style.margin_left + padding,
        top: padding,
        width: image_width,
        height: image_height,
        image: Arc::clone(&row.image),
    })];
    for (index, line) in lines.into_iter().enumerate() {
        items.push(PlacedItem::Text(TextRun {
            x: style.margin_left + image_column + padding,
            baseline: padding + index as f32 * leading + pt_to_mm(size) * ASCENT,
            size,
            weight: FontWeight::Regular,
            color: style.caption_color,
            text: line,
        }));
    }
    let height = image_height.max(caption_height) + 2.0 * padding;
    Measured { height, items }
}
