use anyhow::Result;
use time::UtcOffset;

use crate::layout::fonts::FontSet;
use crate::settings;

use super::client::render_index_html;

/// Read-only state shared by all requests.
pub struct ServerState {
    pub(crate) settings: settings::Settings,
    pub(crate) fonts: FontSet,
    pub(crate) index_html: String,
    /// Offset used for filename timestamps. Resolved before the runtime starts.
    pub(crate) offset: UtcOffset,
}

impl ServerState {
    pub fn new(settings: settings::Settings) -> Result<Self> {
        let fonts = crate::load_fonts(&settings)?;
        let index_html = render_index_html(&settings)?;
        Ok(Self {
            settings,
            fonts,
            index_html,
            offset: UtcOffset::UTC,
        })
    }

    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }
}
