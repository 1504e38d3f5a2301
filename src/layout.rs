//! Stamp geometry
//!
//! Pure functions that place the footer separator, the footer text lines and
//! the QR code on a page. All coordinates are PDF points in default user
//! space, origin at the bottom-left.

/// Distance between the page edge and the stamp
pub const MARGIN: f32 = 20.0;

/// Footer font size for the bottom banner
pub const BOTTOM_FONT_SIZE: f32 = 9.0;

/// Footer font size for the diagonal watermark
pub const DIAGONAL_FONT_SIZE: f32 = 14.0;

/// Line height as a multiple of the font size
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Side length of the QR code square
pub const QR_SIZE: f32 = 60.0;

/// Stroke width of the bottom separator
pub const SEPARATOR_WIDTH: f32 = 0.5;

/// Watermark opacity relative to the configured footer opacity
pub const WATERMARK_OPACITY_FACTOR: f32 = 0.7;

/// Helvetica cap height in text space units (1/1000 em)
const CAP_HEIGHT: f32 = 718.0;

/// A 2D affine transform [a b c d e f]
/// where: x' = a*x + c*y + e, y' = b*x + d*y + f
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    /// Counter-clockwise rotation by `degrees` about `(x, y)`
    ///
    /// `(0, 0)` in the rotated frame lands on `(x, y)`.
    pub fn rotation(degrees: f32, x: f32, y: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self { a: cos, b: sin, c: -sin, d: cos, e: x, f: y }
    }

    /// Axis-aligned scale followed by a translation, as used to place images
    pub fn scale_translate(sx: f32, sy: f32, x: f32, y: f32) -> Self {
        Self { a: sx, b: 0.0, c: 0.0, d: sy, e: x, f: y }
    }

    /// Map a point through this transform
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Same linear part, origin moved to where `(x, y)` maps
    pub fn moved_to(&self, x: f32, y: f32) -> Self {
        let (e, f) = self.apply(x, y);
        Self { e, f, ..*self }
    }

    /// Operands in content-stream order
    pub fn operands(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

/// The visible area of a page (its MediaBox)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    /// Lower-left x
    pub x: f32,
    /// Lower-left y
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    /// Build from MediaBox corners, in either order
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    /// US Letter size (612pt × 792pt)
    pub fn letter() -> Self {
        Self { x: 0.0, y: 0.0, width: 612.0, height: 792.0 }
    }

    /// A4 size (595pt × 842pt)
    pub fn a4() -> Self {
        Self { x: 0.0, y: 0.0, width: 595.0, height: 842.0 }
    }

    /// Page center
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A straight line between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: (f32, f32),
    pub end: (f32, f32),
}

/// Geometry of the bottom banner
#[derive(Debug, Clone, PartialEq)]
pub struct BottomLayout {
    pub font_size: f32,
    /// Separator drawn above the text block
    pub separator: Segment,
    /// Baseline origin of each footer line, first line on top
    pub baselines: Vec<(f32, f32)>,
    pub qr: Rect,
}

/// Geometry of the diagonal watermark
#[derive(Debug, Clone, PartialEq)]
pub struct DiagonalLayout {
    pub font_size: f32,
    /// Text matrix of each footer line, first line on top
    pub line_matrices: Vec<Matrix>,
    pub qr: Rect,
}

fn line_height(font_size: f32) -> f32 {
    font_size * LINE_HEIGHT_FACTOR
}

/// Where the QR code goes: bottom-right corner, margin-aligned
///
/// The same for every footer position; the QR code is never rotated.
pub fn qr_rect(page: &PageBox) -> Rect {
    Rect {
        x: page.x + page.width - MARGIN - QR_SIZE,
        y: page.y + MARGIN,
        width: QR_SIZE,
        height: QR_SIZE,
    }
}

/// Lay out the bottom banner for `line_count` footer lines
///
/// Lines stack upward from the bottom margin so the last line sits on it.
pub fn bottom_layout(page: &PageBox, line_count: usize) -> BottomLayout {
    let font_size = BOTTOM_FONT_SIZE;
    let lh = line_height(font_size);
    let left = page.x + MARGIN;
    let bottom = page.y + MARGIN;

    let baselines = (0..line_count)
        .map(|i| (left, bottom + (line_count - 1 - i) as f32 * lh))
        .collect();

    // A full line height above the top baseline, clear of ascenders (not lh + 5)
    let separator_y = bottom + line_count as f32 * lh;
    let separator = Segment {
        start: (left, separator_y),
        end: (page.x + page.width - MARGIN, separator_y),
    };

    BottomLayout {
        font_size,
        separator,
        baselines,
        qr: qr_rect(page),
    }
}

/// Lay out the diagonal watermark
///
/// `line_widths` are the unscaled widths of each line at
/// [`DIAGONAL_FONT_SIZE`]. Every line is centered on the rotated axis
/// through the page center and the block is centered vertically on it.
/// Lines are not wrapped, so long text can run off narrow pages.
pub fn diagonal_layout(page: &PageBox, line_widths: &[f32], angle_degrees: f32) -> DiagonalLayout {
    let font_size = DIAGONAL_FONT_SIZE;
    let lh = line_height(font_size);
    let (cx, cy) = page.center();
    let frame = Matrix::rotation(angle_degrees, cx, cy);

    let count = line_widths.len() as f32;
    let glyph_center = font_size * CAP_HEIGHT / 2000.0;

    let line_matrices = line_widths
        .iter()
        .enumerate()
        .map(|(i, width)| {
            let local_x = -width / 2.0;
            let local_y = ((count - 1.0) / 2.0 - i as f32) * lh - glyph_center;
            frame.moved_to(local_x, local_y)
        })
        .collect();

    DiagonalLayout {
        font_size,
        line_matrices,
        qr: qr_rect(page),
    }
}
