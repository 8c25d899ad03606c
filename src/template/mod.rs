//! Decoded finger minutiae records.
//!
//! A [`DecodedTemplate`] is the structured form of an ISO/IEC 19794-2:2005
//! finger minutiae record: a fixed header followed by one or more finger
//! views, each carrying its own minutiae. Decoded templates are immutable;
//! decoding the same bytes always yields an equal value.

mod decode;
mod encode;

pub use decode::{decode, decode_base64, MAX_VIEWS};
pub use encode::TemplateBuilder;

/// Ridge feature type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MinutiaKind {
    /// Type not reported, or a reserved code.
    Unknown,
    /// A ridge that stops.
    RidgeEnding,
    /// A ridge that splits in two.
    Bifurcation,
}

impl MinutiaKind {
    pub(crate) fn from_code(code: u16) -> Self {
        match code {
            0b01 => Self::RidgeEnding,
            0b10 => Self::Bifurcation,
            _ => Self::Unknown,
        }
    }

    pub(crate) fn code(self) -> u16 {
        match self {
            Self::Unknown => 0b00,
            Self::RidgeEnding => 0b01,
            Self::Bifurcation => 0b10,
        }
    }
}

/// A single minutia in sensor pixel coordinates.
///
/// The angle is quantized to 256 units per full turn. Minutiae whose
/// coordinates fall outside the declared image are kept so the record
/// round-trips, but they are flagged and never scored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Minutia {
    x: u16,
    y: u16,
    angle: u8,
    kind: MinutiaKind,
    quality: Option<u8>,
    in_bounds: bool,
}

impl Minutia {
    /// Creates an in-bounds minutia without a quality value.
    pub fn new(x: u16, y: u16, angle: u8, kind: MinutiaKind) -> Self {
        Self {
            x,
            y,
            angle,
            kind,
            quality: None,
            in_bounds: true,
        }
    }

    /// Returns a copy carrying the given quality (0 means not reported).
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = (quality != 0).then_some(quality);
        self
    }

    pub(crate) fn bounded_by(mut self, width: u16, height: u16) -> Self {
        // A zero image dimension means the size was not recorded.
        let x_ok = width == 0 || self.x < width;
        let y_ok = height == 0 || self.y < height;
        self.in_bounds = x_ok && y_ok;
        self
    }

    pub fn x(&self) -> u16 {
        self.x
    }

    pub fn y(&self) -> u16 {
        self.y
    }

    /// Quantized direction, 256 units per turn.
    pub fn angle(&self) -> u8 {
        self.angle
    }

    pub fn kind(&self) -> MinutiaKind {
        self.kind
    }

    pub fn quality(&self) -> Option<u8> {
        self.quality
    }

    /// Returns false for minutiae outside the declared image area.
    pub fn is_usable(&self) -> bool {
        self.in_bounds
    }
}

/// Finger position code (0 = unknown, 1..=10 individual fingers).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FingerPosition(pub u8);

impl FingerPosition {
    pub const UNKNOWN: Self = Self(0);

    pub fn is_unknown(self) -> bool {
        self.0 == 0
    }

    /// Two views may show the same finger unless both positions are known
    /// and differ.
    pub fn is_compatible(self, other: Self) -> bool {
        self.is_unknown() || other.is_unknown() || self == other
    }
}

/// One finger capture inside a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FingerView {
    position: FingerPosition,
    view_number: u8,
    impression_type: u8,
    quality: u8,
    minutiae: Vec<Minutia>,
}

impl FingerView {
    /// Creates a live-scan plain impression view.
    pub fn new(position: FingerPosition, minutiae: Vec<Minutia>) -> Self {
        Self {
            position,
            view_number: 0,
            impression_type: 0,
            quality: 0,
            minutiae,
        }
    }

    pub(crate) fn from_parts(
        position: FingerPosition,
        view_number: u8,
        impression_type: u8,
        quality: u8,
        minutiae: Vec<Minutia>,
    ) -> Self {
        Self {
            position,
            view_number,
            impression_type,
            quality,
            minutiae,
        }
    }

    /// Sets view number (low nibble) and impression type (low nibble).
    pub fn with_view(mut self, view_number: u8, impression_type: u8) -> Self {
        self.view_number = view_number & 0x0F;
        self.impression_type = impression_type & 0x0F;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn position(&self) -> FingerPosition {
        self.position
    }

    pub fn view_number(&self) -> u8 {
        self.view_number
    }

    pub fn impression_type(&self) -> u8 {
        self.impression_type
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// All minutiae as stored, including flagged ones.
    pub fn minutiae(&self) -> &[Minutia] {
        &self.minutiae
    }

    /// Minutiae eligible for scoring.
    pub fn usable_minutiae(&self) -> impl Iterator<Item = &Minutia> + '_ {
        self.minutiae.iter().filter(|m| m.is_usable())
    }

    pub fn usable_count(&self) -> usize {
        self.usable_minutiae().count()
    }
}

/// Fixed record header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemplateHeader {
    /// Declared total record length in bytes.
    pub record_length: u32,
    /// Upper 4 bits of the capture equipment field.
    pub compliance: u8,
    /// Lower 12 bits of the capture equipment field.
    pub capture_device_id: u16,
    pub image_width: u16,
    pub image_height: u16,
    pub x_resolution: u16,
    pub y_resolution: u16,
    pub view_count: u8,
}

/// Structured, immutable form of one encoded record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedTemplate {
    header: TemplateHeader,
    views: Vec<FingerView>,
}

impl DecodedTemplate {
    pub(crate) fn from_parts(header: TemplateHeader, views: Vec<FingerView>) -> Self {
        Self { header, views }
    }

    pub fn header(&self) -> &TemplateHeader {
        &self.header
    }

    pub fn views(&self) -> &[FingerView] {
        &self.views
    }

    /// Total scoring-eligible minutiae across all views.
    pub fn usable_minutiae_count(&self) -> usize {
        self.views.iter().map(FingerView::usable_count).sum()
    }
}
