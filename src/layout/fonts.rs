use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use ttf_parser::Face;

use super::style::PT_TO_MM;

/// Advance widths (1/1000 em) of Helvetica for ASCII 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722, 722, 667,
    611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500,
    222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Advance widths (1/1000 em) of Helvetica-Bold for ASCII 32..=126.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722, 722, 667,
    611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556,
    278, 889, 611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// Font program behind one weight: a PDF base-14 font or an embedded TrueType file.
#[derive(Clone)]
pub enum FontSource {
    Builtin(FontWeight),
    External(Arc<TrueTypeFont>),
}

pub struct TrueTypeFont {
    data: Vec<u8>,
    units_per_em: u16,
}

impl TrueTypeFont {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font: {}", path.display()))?;
        Self::from_data(data).with_context(|| format!("failed to parse font: {}", path.display()))
    }

    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        let face = Face::parse(&data, 0).map_err(|err| anyhow!("invalid font data: {}", err))?;
        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err(anyhow!("font reports zero units per em"));
        }
        Ok(Self { data, units_per_em })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn advance_em(&self, text: &str) -> f32 {
        let Ok(face) = Face::parse(&self.data, 0) else {
            return fallback_advance_em(text);
        };
        let units: u32 = text
            .chars()
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .map(u32::from)
                    .unwrap_or(self.units_per_em as u32 / 2)
            })
            .sum();
        units as f32 / self.units_per_em as f32
    }
}

impl FontSource {
    /// Width of `text` in millimetres at `size` points.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let em = match self {
            FontSource::Builtin(weight) => builtin_advance_em(text, *weight),
            FontSource::External(font) => font.advance_em(text),
        };
        em * size * PT_TO_MM
    }
}

/// Regular and bold faces used by the whole document.
#[derive(Clone)]
pub struct FontSet {
    pub regular: FontSource,
    pub bold: FontSource,
}

impl Default for FontSet {
    fn default() -> Self {
        Self {
            regular: FontSource::Builtin(FontWeight::Regular),
            bold: FontSource::Builtin(FontWeight::Bold),
        }
    }
}

impl FontSet {
    /// Loads optional TrueType overrides; a missing path keeps Helvetica.
    pub fn load(regular: Option<&Path>, bold: Option<&Path>) -> Result<Self> {
        let mut fonts = FontSet::default();
        if let Some(path) = regular {
            fonts.regular = FontSource::External(Arc::new(TrueTypeFont::load(path)?));
        }
        if let Some(path) = bold {
            fonts.bold = FontSource::External(Arc::new(TrueTypeFont::load(path)?));
        }
        Ok(fonts)
    }

    pub fn get(&self, weight: FontWeight) -> &FontSource {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }

    pub fn text_width(&self, weight: FontWeight, text: &str, size: f32) -> f32 {
        self.get(weight).text_width(text, size)
    }
}

fn builtin_advance_em(text: &str, weight: FontWeight) -> f32 {
    let table = match weight {
        FontWeight::Regular => &HELVETICA_WIDTHS,
        FontWeight::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    let units: u32 = text
        .chars()
        .map(|ch| {
            let base = fold_latin(ch);
            let code = base as u32;
            if (32..=126).contains(&code) {
                table[(code - 32) as usize] as u32
            } else {
                556
            }
        })
        .sum();
    units as f32 / 1000.0
}

fn fallback_advance_em(text: &str) -> f32 {
    text.chars().count() as f32 * 0.556
}

/// Maps accented Latin-1 letters to the unaccented letter with the same advance.
fn fold_latin(ch: char) -> char {
    match ch {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ñ' => 'N',
        'Ò'..='Ö' | 'Ø' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' => 'Y',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'i',
        'ñ' => 'n',
        'ò'..='ö' | 'ø' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'º' | '°' => 'o',
        'ª' => 'a',
        _ => ch,
    }
}

/// Greedy word wrap to `max_width` millimetres. Explicit newlines are kept,
/// words wider than a line are split by characters.
pub fn wrap_text(
    fonts: &FontSet,
    weight: FontWeight,
    text: &str,
    size: f32,
    max_width: f32,
) -> Vec<String> {
    let font = fonts.get(weight);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if font.text_width(&candidate, size) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if font.text_width(word, size) <= max_width {
                current = word.to_string();
                continue;
            }
            for ch in word.chars() {
                current.push(ch);
                if font.text_width(&current, size) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                }
            }
        }
        lines.push(current);
    }
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}
