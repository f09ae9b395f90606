use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::layout::style::{LayoutStyle, RgbColor};
use crate::normalize::{self, NormalizeOptions, NormalizedImage};
use crate::report::ReportRequest;

#[derive(Debug, Clone)]
pub struct HeaderBlock {
    pub heading: String,
    pub logo: Option<Arc<NormalizedImage>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeparatorLine {
    pub rules: usize,
    pub color: RgbColor,
    pub thickness: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataLine {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct PhotoRow {
    pub image: Arc<NormalizedImage>,
    pub caption: String,
}

/// One unit of document content, consumed in order by the paginator.
#[derive(Debug, Clone)]
pub enum LayoutBlock {
    Header(HeaderBlock),
    Separator(SeparatorLine),
    Metadata(MetadataLine),
    Title(String),
    PhotoRow(PhotoRow),
    PageBreak,
    /// Vertical gap in millimetres.
    Spacer(f32),
}

impl LayoutBlock {
    pub fn is_photo_row(&self) -> bool {
        matches!(self, LayoutBlock::PhotoRow(_))
    }

    fn describe(&self) -> String {
        match self {
            LayoutBlock::Header(header) => format!(
                "header {:?} logo={}",
                header.heading,
                header.logo.is_some()
            ),
            LayoutBlock::Separator(line) => format!("separator x{}", line.rules),
            LayoutBlock::Metadata(line) => format!("metadata {} {}", line.label, line.value),
            LayoutBlock::Title(title) => format!("title {:?}", title),
            LayoutBlock::PhotoRow(row) => format!(
                "photo {}x{} {:?}",
                row.image.width, row.image.height, row.caption
            ),
            LayoutBlock::PageBreak => "page-break".to_string(),
            LayoutBlock::Spacer(height) => format!("spacer {:.1}", height),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Composition {
    pub blocks: Vec<LayoutBlock>,
    /// Photos that made it into the document.
    pub embedded: usize,
    /// Photos dropped because they could not be normalized.
    pub skipped: usize,
}

impl Composition {
    /// One line per block; handy for logs and snapshot tests.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            let _ = writeln!(out, "{}", block.describe());
        }
        out
    }
}

pub fn compose(
    request: &ReportRequest,
    style: &LayoutStyle,
    image_options: &NormalizeOptions,
    logo: Option<Arc<NormalizedImage>>,
) -> Composition {
    let mut blocks = Vec::new();
    let title = request.title.as_deref().map(str::trim).unwrap_or_default();
    let configured_heading = style
        .heading
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let separate_title = configured_heading.is_some() && !title.is_empty();
    let heading = configured_heading.unwrap_or(title).to_string();

    blocks.push(LayoutBlock::Header(HeaderBlock { heading, logo }));
    blocks.push(LayoutBlock::Spacer(style.header_gap));
    blocks.push(LayoutBlock::Separator(SeparatorLine {
        rules: style.separator_rules.max(1),
        color: style.separator_color,
        thickness: style.separator_thickness,
    }));
    blocks.push(LayoutBlock::Spacer(style.separator_gap));

    for (label, value) in request.metadata() {
        blocks.push(LayoutBlock::Metadata(MetadataLine {
            label: label.to_string(),
            value: value.to_string(),
        }));
    }
    blocks.push(LayoutBlock::Spacer(style.metadata_gap));

    if separate_title {
        blocks.push(LayoutBlock::Title(title.to_string()));
        blocks.push(LayoutBlock::Spacer(style.metadata_gap));
    }

    let mut rows = Vec::new();
    let mut skipped = 0;
    for (index, photo) in request.photos.iter().enumerate() {
        match normalize::normalize(&photo.image, image_options) {
            Ok(image) => {
                debug!(
                    "photo {}: normalized to {}x{} ({} bytes)",
                    index,
                    image.width,
                    image.height,
                    image.bytes.len()
                );
                rows.push(PhotoRow {
                    image: Arc::new(image),
                    caption: caption_or_placeholder(photo.caption.as_deref(), style),
                });
            }
            Err(err) => {
                warn!("skipping photo {}: {}", index, err);
                skipped += 1;
            }
        }
    }

    let embedded = rows.len();
    for (index, row) in rows.into_iter().enumerate() {
        let is_last = index + 1 == embedded;
        blocks.push(LayoutBlock::PhotoRow(row));
        if is_last {
            blocks.push(LayoutBlock::Spacer(style.trailing_gap));
            continue;
        }
        blocks.push(LayoutBlock::Spacer(style.row_gap_before));
        blocks.push(LayoutBlock::Separator(SeparatorLine {
            rules: 1,
            color: style.divider_color,
            thickness: style.divider_thickness,
        }));
        blocks.push(LayoutBlock::Spacer(style.row_gap_after));
        if (index + 1) % 2 == 0 {
            blocks.push(LayoutBlock::PageBreak);
        }
    }

    Composition {
        blocks,
        embedded,
        skipped,
    }
}

fn caption_or_placeholder(caption: Option<&str>, style: &LayoutStyle) -> String {
    caption
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| style.placeholder_caption.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::PhotoEntry;
    use crate::test_util::{png_data_uri, request_with_photos};

    fn forced_breaks_after(composition: &Composition) -> Vec<usize> {
        let mut rows_seen = 0;
        let mut breaks = Vec::new();
        for block in &composition.blocks {
            match block {
                LayoutBlock::PhotoRow(_) => rows_seen += 1,
                LayoutBlock::PageBreak => breaks.push(rows_seen),
                _ => {}
            }
        }
        breaks
    }

    fn compose_default(request: &ReportRequest) -> Composition {
        compose(
            request,
            &LayoutStyle::default(),
            &NormalizeOptions::default(),
            None,
        )
    }

    #[test]
    fn two_photos_share_a_page() {
        let composition = compose_default(&request_with_photos(2));
        assert_eq!(composition.embedded, 2);
        assert!(forced_breaks_after(&composition).is_empty());
    }

    #[test]
    fn three_photos_break_after_the_second_only() {
        let composition = compose_default(&request_with_photos(3));
        assert_eq!(forced_breaks_after(&composition), vec![2]);
        assert!(!matches!(
            composition.blocks.last(),
            Some(LayoutBlock::PageBreak)
        ));
    }

    #[test]
    fn four_photos_have_no_trailing_break() {
        let composition = compose_default(&request_with_photos(4));
        assert_eq!(forced_breaks_after(&composition), vec![2]);
    }

    #[test]
    fn break_counting_ignores_skipped_photos() {
        let mut request = request_with_photos(3);
        request.photos.insert(
            1,
            PhotoEntry {
                image: "data:image/png;base64,%%%".to_string(),
                caption: None,
            },
        );
        let composition = compose_default(&request);
        assert_eq!(composition.embedded, 3);
        assert_eq!(composition.skipped, 1);
        assert_eq!(forced_breaks_after(&composition), vec![2]);
    }

    #[test]
    fn corrupt_photo_yields_no_rows() {
        let mut request = request_with_photos(0);
        request.photos.push(PhotoEntry {
            image: "bm90IGFuIGltYWdl".to_string(),
            caption: Some("broken".to_string()),
        });
        let composition = compose_default(&request);
        assert_eq!(composition.embedded, 0);
        assert_eq!(composition.skipped, 1);
        assert!(!composition.blocks.iter().any(LayoutBlock::is_photo_row));
        assert!(
            composition
                .blocks
                .iter()
                .any(|block| matches!(block, LayoutBlock::Metadata(_)))
        );
    }

    #[test]
    fn blank_captions_fall_back_to_placeholder() {
        let mut request = request_with_photos(0);
        request.photos.push(PhotoEntry {
            image: png_data_uri(4, 3),
            caption: Some("   ".to_string()),
        });
        let composition = compose_default(&request);
        let caption = composition.blocks.iter().find_map(|block| match block {
            LayoutBlock::PhotoRow(row) => Some(row.caption.clone()),
            _ => None,
        });
        assert_eq!(caption.as_deref(), Some("Sem observações"));
    }

    #[test]
    fn only_populated_metadata_is_emitted() {
        let mut request = request_with_photos(1);
        request.location = Some("Estação José Bonifácio".to_string());
        request.system_ref = Some("   ".to_string());
        request.date = None;
        let composition = compose_default(&request);
        let metadata: Vec<_> = composition
            .blocks
            .iter()
            .filter_map(|block| match block {
                LayoutBlock::Metadata(line) => Some(line.label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(metadata, vec!["Local:"]);
    }

    #[test]
    fn blank_heading_keeps_title_in_header_only() {
        let style = LayoutStyle {
            heading: Some("   ".to_string()),
            ..LayoutStyle::default()
        };
        let composition = compose(
            &request_with_photos(1),
            &style,
            &NormalizeOptions::default(),
            None,
        );
        match &composition.blocks[0] {
            LayoutBlock::Header(header) => assert_eq!(header.heading, "Audit Report"),
            other => panic!("unexpected first block: {:?}", other),
        }
        assert!(
            !composition
                .blocks
                .iter()
                .any(|block| matches!(block, LayoutBlock::Title(_)))
        );
    }

    #[test]
    fn configured_heading_moves_title_below_metadata() {
        let request = request_with_photos(1);
        let style = LayoutStyle {
            heading: Some("Relatório de estados".to_string()),
            separator_rules: 3,
            ..LayoutStyle::default()
        };
        let composition = compose(&request, &style, &NormalizeOptions::default(), None);
        match &composition.blocks[0] {
            LayoutBlock::Header(header) => assert_eq!(header.heading, "Relatório de estados"),
            other => panic!("unexpected first block: {:?}", other),
        }
        assert!(composition.blocks.iter().any(
            |block| matches!(block, LayoutBlock::Title(title) if title == "Audit Report")
        ));
        assert!(composition.blocks.iter().any(
            |block| matches!(block, LayoutBlock::Separator(line) if line.rules == 3)
        ));
    }
}
