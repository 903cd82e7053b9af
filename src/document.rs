//! Turns page SVGs into printable output: one multi-page A4 PDF, or one
//! 300 DPI PNG per page.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref};
use resvg::usvg;
use thiserror::Error;
use tiny_skia::{Color, Pixmap, Transform};

/// A4 in PDF points.
pub const A4_WIDTH_PT: f32 = 595.276;
pub const A4_HEIGHT_PT: f32 = 841.89;

/// A4 at 300 DPI.
pub const A4_WIDTH_PX: u32 = 2480;
pub const A4_HEIGHT_PX: u32 = 3508;

const LOCAL_FONTS_DIR: &str = "fonts";

// svg2pdf and resvg pin different usvg releases, so their font databases are
// distinct types with the same API.
macro_rules! load_fonts {
    ($fontdb:expr) => {{
        let fontdb = $fontdb;
        fontdb.load_system_fonts();
        let local_fonts = Path::new(LOCAL_FONTS_DIR);
        if local_fonts.is_dir() {
            fontdb.load_fonts_dir(local_fonts);
        }
        let family = pick_sans_family(
            fontdb
                .faces()
                .flat_map(|face| face.families.iter().map(|(family, _)| family.as_str())),
        )
        .map(str::to_string);
        if let Some(family) = family {
            fontdb.set_sans_serif_family(family);
        }
    }};
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("no pages to assemble")]
    NoPages,
    #[error("failed to parse SVG for page {page}: {message}")]
    SvgParse { page: usize, message: String },
    #[error("failed to convert page {page} to PDF: {message}")]
    PdfConvert { page: usize, message: String },
    #[error("failed to allocate an A4 pixmap")]
    PixmapAlloc,
    #[error("failed to encode PNG: {0}")]
    PngEncode(String),
}

/// Concatenates page SVGs, in order, into one PDF with an A4 page each.
pub fn assemble_pdf(pages: &[String]) -> Result<Vec<u8>, DocumentError> {
    if pages.is_empty() {
        return Err(DocumentError::NoPages);
    }

    let opts = svg2pdf::usvg::Options {
        fontdb: Arc::new(pdf_font_database()),
        ..Default::default()
    };
    let mut alloc = Ref::new(1);
    let catalog_id = alloc.bump();
    let page_tree_id = alloc.bump();
    let svg_name = Name(b"S1");

    let mut pdf = Pdf::new();
    let mut page_ids = Vec::with_capacity(pages.len());

    for (page, svg) in pages.iter().enumerate() {
        let tree = svg2pdf::usvg::Tree::from_str(svg, &opts).map_err(|e| {
            DocumentError::SvgParse {
                page,
                message: e.to_string(),
            }
        })?;
        let (chunk, svg_ref) = svg2pdf::to_chunk(&tree, conversion_options()).map_err(|e| {
            DocumentError::PdfConvert {
                page,
                message: e.to_string(),
            }
        })?;

        let mut renumbered = HashMap::new();
        let chunk = chunk.renumber(|old| *renumbered.entry(old).or_insert_with(|| alloc.bump()));
        let svg_id = renumbered
            .get(&svg_ref)
            .copied()
            .ok_or_else(|| DocumentError::PdfConvert {
                page,
                message: "converted page has no XObject".to_string(),
            })?;

        let page_id = alloc.bump();
        let content_id = alloc.bump();
        page_ids.push(page_id);

        let mut pdf_page = pdf.page(page_id);
        pdf_page.media_box(Rect::new(0.0, 0.0, A4_WIDTH_PT, A4_HEIGHT_PT));
        pdf_page.parent(page_tree_id);
        pdf_page.contents(content_id);
        let mut resources = pdf_page.resources();
        resources.x_objects().pair(svg_name, svg_id);
        resources.finish();
        pdf_page.finish();

        // The converted XObject spans the unit square; stretch it over the page.
        let mut content = Content::new();
        content
            .save_state()
            .transform([A4_WIDTH_PT, 0.0, 0.0, A4_HEIGHT_PT, 0.0, 0.0])
            .x_object(svg_name)
            .restore_state();
        pdf.stream(content_id, &content.finish());
        pdf.extend(&chunk);
    }

    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    Ok(pdf.finish())
}

/// Rasterizes page SVGs to A4 PNGs at 300 DPI on a white background.
///
/// Loading fonts is the slow part, so one renderer serves every page.
pub struct PngRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl PngRenderer {
    /// Loads system fonts plus any in `./fonts`.
    pub fn new() -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        load_fonts!(&mut fontdb);
        Self::with_fonts(fontdb)
    }

    pub fn with_fonts(fontdb: usvg::fontdb::Database) -> Self {
        Self {
            fontdb: Arc::new(fontdb),
        }
    }

    pub fn render(&self, svg: &str) -> Result<Vec<u8>, DocumentError> {
        let opts = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(svg, &opts).map_err(|e| DocumentError::SvgParse {
            page: 0,
            message: e.to_string(),
        })?;

        let mut pixmap =
            Pixmap::new(A4_WIDTH_PX, A4_HEIGHT_PX).ok_or(DocumentError::PixmapAlloc)?;
        pixmap.fill(Color::WHITE);

        let size = tree.size();
        let transform = Transform::from_scale(
            A4_WIDTH_PX as f32 / size.width(),
            A4_HEIGHT_PX as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|e| DocumentError::PngEncode(e.to_string()))
    }
}

impl Default for PngRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Text is converted to paths so pages print without embedded fonts.
fn conversion_options() -> svg2pdf::ConversionOptions {
    svg2pdf::ConversionOptions {
        embed_text: false,
        ..Default::default()
    }
}

fn pdf_font_database() -> svg2pdf::usvg::fontdb::Database {
    let mut fontdb = svg2pdf::usvg::fontdb::Database::new();
    load_fonts!(&mut fontdb);
    fontdb
}

/// First family whose name mentions "sans", else the first family at all.
fn pick_sans_family<'a>(families: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut first = None;
    for family in families {
        if family.to_ascii_lowercase().contains("sans") {
            return Some(family);
        }
        first.get_or_insert(family);
    }
    first
}
