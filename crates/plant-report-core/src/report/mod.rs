//! PDF report rendering.
//!
//! A report is a flowing single column on US-Letter pages:
//!
//! ```text
//!              Plant Analysis Report          (bold, centered)
//!
//! Date: 10/17/2026
//!
//! <analysis text, wrapped, continues onto new pages>
//!
//!                 [ photo, fitted ]
//! ```
//!
//! Everything is drawn with the base-14 Helvetica faces, so the output has
//! no embedded fonts and only the photo contributes significant size.

mod font;
mod image;
mod layout;

use std::io::Write;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::config::ReportConfig;
use crate::error::{Error, Result};

pub use self::font::{ReportFont, encode_win_ansi};
pub use self::image::EmbeddedImage;
pub use self::layout::{wrap_paragraph, wrap_text};

/// US-Letter, in points.
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 72.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

/// Helvetica line height and ascent as fractions of the font size.
const LINE_HEIGHT: f32 = 1.156;
const ASCENT: f32 = 0.718;

const IMAGE_RESOURCE: &str = "Im1";

/// What goes into one report.
#[derive(Debug, Clone, Default)]
pub struct ReportContent {
    pub title: String,
    /// Already formatted, printed after `Date: `
    pub date: String,
    pub body: String,
    /// Raw image bytes (JPEG, PNG, WebP, ...)
    pub image: Option<Vec<u8>>,
}

/// Turns [`ReportContent`] into PDF bytes.
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer {
    config: ReportConfig,
}

impl ReportRenderer {
    pub const fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Render into memory.
    pub fn render(&self, content: &ReportContent) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.render_to(content, &mut output)?;
        Ok(output)
    }

    /// Render and write the finished document to `out`.
    pub fn render_to<W: Write>(&self, content: &ReportContent, out: &mut W) -> Result<()> {
        let mut doc = self.build(content)?;
        doc.save_to(out)
            .map_err(|e| Error::PdfSave(format!("Failed to write PDF: {e}")))?;
        Ok(())
    }

    fn build(&self, content: &ReportContent) -> Result<Document> {
        // Decode first so a bad image fails before any layout work
        let image = content
            .image
            .as_deref()
            .map(EmbeddedImage::from_bytes)
            .transpose()?;

        let cfg = &self.config;
        let mut pages = PageFlow::new();

        for line in wrap_text(&content.title, ReportFont::Bold, cfg.title_font_size, CONTENT_WIDTH) {
            pages.centered_line(ReportFont::Bold, cfg.title_font_size, &line);
        }
        pages.move_down(cfg.title_font_size);

        let date_line = format!("Date: {}", content.date);
        for line in wrap_text(&date_line, ReportFont::Regular, cfg.date_font_size, CONTENT_WIDTH) {
            pages.line(ReportFont::Regular, cfg.date_font_size, &line);
        }
        pages.move_down(cfg.date_font_size);

        for line in wrap_text(&content.body, ReportFont::Regular, cfg.body_font_size, CONTENT_WIDTH) {
            pages.line(ReportFont::Regular, cfg.body_font_size, &line);
        }

        let mut doc = Document::with_version("1.5");

        let mut xobjects = Dictionary::new();
        if let Some(image) = image {
            pages.move_down(cfg.body_font_size);
            let box_size = cfg.image_fit.min(CONTENT_WIDTH);
            let (w, h) = image.fit(box_size);
            pages.image(box_size, w, h);
            xobjects.set(IMAGE_RESOURCE, Object::Reference(image.add_to(&mut doc)));
        }

        let resources_id = add_resources(&mut doc, xobjects);
        let page_count = pages.finish(&mut doc, resources_id)?;

        let info_id = doc.add_object(Dictionary::from_iter([
            ("Title", Object::String(encode_win_ansi(&content.title), StringFormat::Literal)),
            ("Producer", Object::string_literal("plant-report")),
        ]));
        doc.trailer.set("Info", Object::Reference(info_id));

        doc.compress();
        debug!("Rendered report with {} page(s)", page_count);
        Ok(doc)
    }
}

fn add_resources(doc: &mut Document, xobjects: Dictionary) -> ObjectId {
    let mut fonts = Dictionary::new();
    for font in ReportFont::ALL {
        let font_id = doc.add_object(font.dictionary());
        fonts.set(font.resource_name(), Object::Reference(font_id));
    }

    let mut resources = Dictionary::from_iter([("Font", Object::Dictionary(fonts))]);
    if !xobjects.is_empty() {
        resources.set("XObject", Object::Dictionary(xobjects));
    }
    doc.add_object(resources)
}

/// Cursor-driven page builder. `y` is measured down from the top edge.
struct PageFlow {
    pages: Vec<Vec<Operation>>,
    y: f32,
}

impl PageFlow {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: MARGIN,
        }
    }

    fn current(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Start a new page unless `height` more points fit on this one.
    fn reserve(&mut self, height: f32) {
        let at_top = (self.y - MARGIN).abs() < f32::EPSILON;
        if !at_top && self.y + height > PAGE_HEIGHT - MARGIN {
            self.pages.push(Vec::new());
            self.y = MARGIN;
        }
    }

    fn move_down(&mut self, font_size: f32) {
        self.y += font_size * LINE_HEIGHT;
    }

    fn line(&mut self, font: ReportFont, font_size: f32, text: &str) {
        self.line_at(font, font_size, MARGIN, text);
    }

    fn centered_line(&mut self, font: ReportFont, font_size: f32, text: &str) {
        let width = font.string_width(text, font_size);
        let x = MARGIN + ((CONTENT_WIDTH - width) / 2.0).max(0.0);
        self.line_at(font, font_size, x, text);
    }

    fn line_at(&mut self, font: ReportFont, font_size: f32, x: f32, text: &str) {
        let height = font_size * LINE_HEIGHT;
        self.reserve(height);

        let baseline = PAGE_HEIGHT - self.y - font_size * ASCENT;
        if !text.is_empty() {
            self.current().extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![font.resource_name().into(), font_size.into()]),
                Operation::new("Td", vec![x.into(), baseline.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]);
        }
        self.y += height;
    }

    /// Draw the image centered in a `box_size` square at the cursor.
    fn image(&mut self, box_size: f32, width: f32, height: f32) {
        self.reserve(box_size);

        let x = MARGIN + (box_size - width) / 2.0 + (CONTENT_WIDTH - box_size) / 2.0;
        let top = self.y + (box_size - height) / 2.0;
        let bottom = PAGE_HEIGHT - top - height;

        self.current().extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    x.into(),
                    bottom.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        self.y += box_size;
    }

    /// Emit the page tree and catalog. Returns the page count.
    fn finish(self, doc: &mut Document, resources_id: ObjectId) -> Result<usize> {
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(self.pages.len());

        for operations in self.pages {
            let bytes = Content { operations }
                .encode()
                .map_err(|e| Error::PdfRender(format!("Failed to encode page content: {e}")))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), bytes));

            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Reference(resources_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        0.into(),
                        0.into(),
                        PAGE_WIDTH.into(),
                        PAGE_HEIGHT.into(),
                    ]),
                ),
            ]));
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len();
        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(i64::try_from(count).unwrap_or(i64::MAX))),
            ("Kids", Object::Array(kids)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Ok(count)
    }
}
