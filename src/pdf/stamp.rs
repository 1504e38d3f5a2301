//! License stamping of PDF pages using lopdf
//!
//! Every page of a document receives the same stamp: two footer lines naming
//! the licensee and the license, plus a QR code carrying the license payload.
//! The footer is drawn either as a bottom banner or as a diagonal watermark.
//!
//! Fonts, the QR image and the opacity state are added to the document once and
//! shared by a single resources dictionary. Each page gets a Form XObject
//! sized to its MediaBox that draws the stamp, invoked after the page's own
//! content.
//!
//! The stamp is written as an incremental update: the input bytes are kept
//! verbatim and only new or changed objects are appended after them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use lopdf::{Dictionary, Document, IncrementalDocument, Object, ObjectId, Stream};
use tracing::{debug, info};
use crate::config::StampConfig;
use crate::error::{Error, Result};
use crate::layout::{
    bottom_layout, diagonal_layout, Matrix, PageBox, Rect, DIAGONAL_FONT_SIZE, SEPARATOR_WIDTH,
    WATERMARK_OPACITY_FACTOR,
};
use super::fonts::{embed_standard_font, encode_win_ansi, text_width, HELVETICA, HELVETICA_BOLD};
use super::qr::{self, QrImage};

/// Resource name of the per-page stamp Form XObject
const STAMP_XOBJECT_NAME: &str = "LicenseStamp";

/// Gray level of the footer text
const TEXT_GRAY: f32 = 0.3;

/// Gray level of the bottom separator
const SEPARATOR_GRAY: f32 = 0.7;

/// Upper bound on page tree depth when looking up inherited attributes
const MAX_TREE_DEPTH: usize = 64;

/// Where the footer text goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterPosition {
    /// Banner along the bottom margin
    Bottom,
    /// Rotated watermark across the page center
    Diagonal,
}

impl FromStr for FooterPosition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bottom" => Ok(FooterPosition::Bottom),
            "diagonal" => Ok(FooterPosition::Diagonal),
            other => Err(format!(
                "unknown footer position '{}' (expected 'bottom' or 'diagonal')",
                other
            )),
        }
    }
}

impl fmt::Display for FooterPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FooterPosition::Bottom => f.write_str("bottom"),
            FooterPosition::Diagonal => f.write_str("diagonal"),
        }
    }
}

/// Fully resolved parameters of one stamping call
#[derive(Debug, Clone, PartialEq)]
pub struct StampOptions {
    /// Licensee name
    pub customer_name: String,
    /// Licensee organization, shown in parentheses when present
    pub organization: Option<String>,
    /// Order number
    pub order_number: String,
    /// Number of copies the license allows
    pub licensed_quantity: u32,
    /// License identifier
    pub license_id: String,
    /// License date as `YYYY-MM-DD`
    pub date_iso: String,
    /// Footer layout
    pub footer_position: FooterPosition,
}

impl StampOptions {
    /// Check the fields a caller must fill in before stamping
    ///
    /// The stamper itself does not call this.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("customer name", &self.customer_name),
            ("order number", &self.order_number),
            ("license id", &self.license_id),
            ("date", &self.date_iso),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidOptions(format!("{} is required", field)));
            }
        }
        if self.licensed_quantity == 0 {
            return Err(Error::InvalidOptions(
                "licensed quantity must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// The two footer lines, top line first
    pub fn footer_lines(&self) -> Vec<String> {
        let org = match self.organization.as_deref() {
            Some(org) if !org.trim().is_empty() => format!(" ({})", org),
            _ => String::new(),
        };

        vec![
            format!("Licensed to: {}{}", self.customer_name, org),
            format!(
                "Order {} • License {} • Up to {} copies • {}",
                self.order_number, self.license_id, self.licensed_quantity, self.date_iso
            ),
        ]
    }
}

/// Stamp every page of a PDF and return the new document
///
/// Fails with [`Error::InputDocument`] when `pdf_bytes` is not a loadable
/// PDF. Nothing is returned unless every page was stamped.
///
/// # Example
///
/// ```no_run
/// use license_stamp::config::StampConfig;
/// use license_stamp::pdf::{stamp_pdf, FooterPosition, StampOptions};
///
/// let input = std::fs::read("score.pdf").expect("read input");
/// let options = StampOptions {
///     customer_name: "Jane Smith".to_string(),
///     organization: Some("Limerick Cathedral Choir".to_string()),
///     order_number: "CAIL-1234".to_string(),
///     licensed_quantity: 35,
///     license_id: "test-license-123".to_string(),
///     date_iso: "2024-01-15".to_string(),
///     footer_position: FooterPosition::Bottom,
/// };
///
/// let stamped = stamp_pdf(&input, &options, &StampConfig::default())
///     .expect("Failed to stamp PDF");
/// std::fs::write("score-stamped.pdf", stamped).expect("write output");
/// ```
pub fn stamp_pdf(pdf_bytes: &[u8], options: &StampOptions, config: &StampConfig) -> Result<Vec<u8>> {
    let prev = Document::load_mem(pdf_bytes).map_err(Error::InputDocument)?;
    let pages: Vec<ObjectId> = prev.get_pages().into_values().collect();
    let mut incremental = IncrementalDocument::create_from(pdf_bytes.to_vec(), prev);

    let qr_image = qr::encode(
        &options.license_id,
        &options.order_number,
        options.licensed_quantity,
    )?;

    let lines = options
        .footer_lines()
        .iter()
        .map(|line| encode_win_ansi(line))
        .collect::<Result<Vec<_>>>()?;

    let opacity = match options.footer_position {
        FooterPosition::Bottom => config.footer_opacity,
        FooterPosition::Diagonal => config.footer_opacity * WATERMARK_OPACITY_FACTOR,
    };
    let resources_id = embed_stamp_resources(&mut incremental.new_document, &qr_image, opacity)?;

    // Saves the graphics state ahead of each page's own content
    let open_id = add_compressed_stream(&mut incremental.new_document, Dictionary::new(), b"q\n".to_vec())?;
    let mut invocations: BTreeMap<String, ObjectId> = BTreeMap::new();

    for (i, page_id) in pages.iter().enumerate() {
        let page_box = page_box(incremental.get_prev_documents(), *page_id);

        let content = match options.footer_position {
            FooterPosition::Bottom => draw_bottom(&page_box, &lines),
            FooterPosition::Diagonal => {
                draw_diagonal(&page_box, &lines, config.diagonal_angle_degrees)
            }
        };

        let xobject_id = create_stamp_xobject(&mut incremental.new_document, content, resources_id, &page_box)?;
        let name = add_xobject_to_page_resources(&mut incremental, *page_id, xobject_id)?;

        let invoke_id = match invocations.get(&name).copied() {
            Some(id) => id,
            None => {
                let invoke_content = format!("Q\nq\n/{} Do\nQ\n", name);
                let id = add_compressed_stream(
                    &mut incremental.new_document,
                    Dictionary::new(),
                    invoke_content.into_bytes(),
                )?;
                invocations.insert(name.clone(), id);
                id
            }
        };

        wrap_page_content(&mut incremental, *page_id, open_id, invoke_id)?;

        debug!(
            page = i + 1,
            width = page_box.width,
            height = page_box.height,
            xobject = %name,
            "stamped page"
        );
    }

    let mut output = Vec::new();
    incremental.save_to(&mut output)?;

    info!(
        pages = pages.len(),
        position = %options.footer_position,
        input_bytes = pdf_bytes.len(),
        output_bytes = output.len(),
        "stamped document"
    );

    Ok(output)
}

/// Stamp a PDF file and write the result to `output_path`
pub fn stamp_file(
    input_path: &Path,
    output_path: &Path,
    options: &StampOptions,
    config: &StampConfig,
) -> Result<()> {
    if !input_path.exists() {
        return Err(Error::FileNotFound(input_path.to_path_buf()));
    }

    let input = std::fs::read(input_path)?;
    let stamped = stamp_pdf(&input, options, config)?;
    std::fs::write(output_path, stamped)?;

    Ok(())
}

/// Add fonts, QR image and opacity state, returning the shared resources dictionary
fn embed_stamp_resources(doc: &mut Document, qr_image: &QrImage, opacity: f32) -> Result<ObjectId> {
    let regular_id = embed_standard_font(doc, HELVETICA);
    let bold_id = embed_standard_font(doc, HELVETICA_BOLD);
    let qr_id = embed_qr_image(doc, qr_image)?;

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(regular_id));
    fonts.set("F2", Object::Reference(bold_id));

    let mut xobjects = Dictionary::new();
    xobjects.set("Qr", Object::Reference(qr_id));

    // Fill opacity for text, stroke opacity for the separator
    let mut gs = Dictionary::new();
    gs.set("Type", Object::Name(b"ExtGState".to_vec()));
    gs.set("ca", Object::Real(opacity));
    gs.set("CA", Object::Real(opacity));
    let gs_id = doc.add_object(Object::Dictionary(gs));

    let mut states = Dictionary::new();
    states.set("GsStamp", Object::Reference(gs_id));

    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    resources.set("XObject", Object::Dictionary(xobjects));
    resources.set("ExtGState", Object::Dictionary(states));

    debug!(opacity, qr_pixels = qr_image.size(), "embedded stamp resources");

    Ok(doc.add_object(Object::Dictionary(resources)))
}

/// Add the QR raster as a lossless DeviceGray image XObject
fn embed_qr_image(doc: &mut Document, qr_image: &QrImage) -> Result<ObjectId> {
    let size = qr_image.size() as i64;

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(size));
    dict.set("Height", Object::Integer(size));
    dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Interpolate", Object::Boolean(false));

    let mut stream = Stream::new(dict, qr_image.pixels().to_vec());
    stream
        .compress()
        .map_err(|e| Error::ResourceEmbed(format!("QR image: {}", e)))?;

    Ok(doc.add_object(Object::Stream(stream)))
}

/// Add a Flate-compressed stream and return its object ID
fn add_compressed_stream(doc: &mut Document, dict: Dictionary, content: Vec<u8>) -> Result<ObjectId> {
    let mut stream = Stream::new(dict, content);
    stream.compress()?;
    Ok(doc.add_object(Object::Stream(stream)))
}

/// Content stream operators for the bottom banner
fn draw_bottom(page: &PageBox, lines: &[Vec<u8>]) -> String {
    let layout = bottom_layout(page, lines.len());
    let mut content = String::new();

    content.push_str("q\n/GsStamp gs\n");

    // Separator
    content.push_str(&format!("{0} {0} {0} RG\n", fmt_num(SEPARATOR_GRAY)));
    content.push_str(&format!("{} w\n", fmt_num(SEPARATOR_WIDTH)));
    content.push_str(&format!(
        "{} {} m\n{} {} l\nS\n",
        fmt_num(layout.separator.start.0),
        fmt_num(layout.separator.start.1),
        fmt_num(layout.separator.end.0),
        fmt_num(layout.separator.end.1),
    ));

    // Footer lines
    content.push_str(&format!("{0} {0} {0} rg\n", fmt_num(TEXT_GRAY)));
    for (line, (x, y)) in lines.iter().zip(&layout.baselines) {
        content.push_str("BT\n");
        content.push_str(&format!("/F1 {} Tf\n", fmt_num(layout.font_size)));
        content.push_str(&format!("1 0 0 1 {} {} Tm\n", fmt_num(*x), fmt_num(*y)));
        content.push_str(&format!("{} Tj\n", hex_string(line)));
        content.push_str("ET\n");
    }

    content.push_str("Q\n");

    draw_qr(&mut content, &layout.qr);
    content
}

/// Content stream operators for the diagonal watermark
fn draw_diagonal(page: &PageBox, lines: &[Vec<u8>], angle_degrees: f32) -> String {
    let widths: Vec<f32> = lines
        .iter()
        .map(|line| text_width(line, DIAGONAL_FONT_SIZE))
        .collect();
    let layout = diagonal_layout(page, &widths, angle_degrees);
    let mut content = String::new();

    content.push_str("q\n/GsStamp gs\n");
    content.push_str(&format!("{0} {0} {0} rg\n", fmt_num(TEXT_GRAY)));

    // One text object for the whole watermark
    content.push_str("BT\n");
    content.push_str(&format!("/F1 {} Tf\n", fmt_num(layout.font_size)));
    for (line, matrix) in lines.iter().zip(&layout.line_matrices) {
        let ops: Vec<String> = matrix.operands().iter().map(|v| fmt_num(*v)).collect();
        content.push_str(&format!("{} Tm\n", ops.join(" ")));
        content.push_str(&format!("{} Tj\n", hex_string(line)));
    }
    content.push_str("ET\n");

    content.push_str("Q\n");

    draw_qr(&mut content, &layout.qr);
    content
}

/// Place the QR image, unrotated and at full opacity
fn draw_qr(content: &mut String, rect: &Rect) {
    let placement = Matrix::scale_translate(rect.width, rect.height, rect.x, rect.y);
    let ops: Vec<String> = placement.operands().iter().map(|v| fmt_num(*v)).collect();
    content.push_str("q\n");
    content.push_str(&format!("{} cm\n", ops.join(" ")));
    content.push_str("/Qr Do\n");
    content.push_str("Q\n");
}

/// Format a number for a content stream: at most two decimals, no trailing zeros
fn fmt_num(value: f32) -> String {
    if value.abs() < 0.005 {
        return "0".to_string();
    }
    let s = format!("{:.2}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Hex string operand for encoded text
fn hex_string(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2 + 2);
    s.push('<');
    for b in bytes {
        s.push_str(&format!("{:02X}", b));
    }
    s.push('>');
    s
}

/// Look up a page attribute, following the page tree upward for inherited ones
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = Some(page_id);
    let mut depth = 0;

    while let Some(id) = current {
        if depth > MAX_TREE_DEPTH {
            break;
        }
        depth += 1;

        let dict = doc.get_object(id).and_then(|o| o.as_dict()).ok()?;
        if let Ok(value) = dict.get(key) {
            return match value {
                Object::Reference(ref_id) => doc.get_object(*ref_id).ok().cloned(),
                other => Some(other.clone()),
            };
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }

    None
}

/// Read a page's MediaBox, falling back to US Letter
fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let corners: Option<Vec<f32>> = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| match obj {
            Object::Array(arr) if arr.len() == 4 => {
                arr.iter().map(|v| resolve_number(doc, v)).collect()
            }
            _ => None,
        });

    match corners {
        Some(c) => PageBox::from_corners(c[0], c[1], c[2], c[3]),
        None => PageBox::letter(),
    }
}

fn resolve_number(doc: &Document, obj: &Object) -> Option<f32> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_float().ok(),
        other => other.as_float().ok(),
    }
}

/// Create the Form XObject holding one page's stamp
fn create_stamp_xobject(
    doc: &mut Document,
    content: String,
    resources_id: ObjectId,
    page: &PageBox,
) -> Result<ObjectId> {
    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));

    // The form draws in page coordinates, clipped to the MediaBox
    xobject_dict.set("BBox", Object::Array(vec![
        Object::Real(page.x),
        Object::Real(page.y),
        Object::Real(page.x + page.width),
        Object::Real(page.y + page.height),
    ]));
    xobject_dict.set("Matrix", Object::Array(vec![
        Object::Integer(1),
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(1),
        Object::Integer(0),
        Object::Integer(0),
    ]));
    xobject_dict.set("Resources", Object::Reference(resources_id));

    add_compressed_stream(doc, xobject_dict, content.into_bytes())
}

/// Register the stamp XObject in the page's Resources
///
/// Inherited resources are copied onto the page so its existing content keeps
/// resolving. Returns the resource name used, which only differs from
/// `LicenseStamp` when the page already has an XObject by that name.
fn add_xobject_to_page_resources(
    incremental: &mut IncrementalDocument,
    page_id: ObjectId,
    xobject_id: ObjectId,
) -> Result<String> {
    let doc = incremental.get_prev_documents();
    let mut resources = match inherited_attribute(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict,
        _ => Dictionary::new(),
    };

    let mut xobjects = match resources.get(b"XObject") {
        Ok(Object::Dictionary(xo)) => xo.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Dictionary(xo)) => xo.clone(),
            _ => Dictionary::new(),
        },
        _ => Dictionary::new(),
    };

    let name = unique_resource_name(&xobjects, STAMP_XOBJECT_NAME);
    xobjects.set(name.as_str(), Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    incremental.opt_clone_object_to_new_document(page_id)?;
    let page_dict = incremental.new_document.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// `base`, or `base` with the first free numeric suffix
fn unique_resource_name(dict: &Dictionary, base: &str) -> String {
    if !dict.has(base.as_bytes()) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !dict.has(candidate.as_bytes()))
        .unwrap_or_else(|| base.to_string())
}

/// Wrap the page's existing content in q/Q and append the stamp invocation
///
/// `open_id` saves the graphics state; `invoke_id` restores it and draws the
/// stamp, so a transform left behind by the page cannot move the stamp.
fn wrap_page_content(
    incremental: &mut IncrementalDocument,
    page_id: ObjectId,
    open_id: ObjectId,
    invoke_id: ObjectId,
) -> Result<()> {
    let existing: Vec<Object> = {
        let doc = incremental.get_prev_documents();
        let page_dict = doc.get_object(page_id)?.as_dict()?;
        match page_dict.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                // Contents may point at an array of streams
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        }
    };

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(invoke_id));

    incremental.opt_clone_object_to_new_document(page_id)?;
    let page_dict = incremental.new_document.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Contents", Object::Array(contents));

    Ok(())
}
