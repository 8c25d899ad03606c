//! Binary record parser.
//!
//! Layout checks run in a fixed order: format tag, declared length against
//! the actual buffer, then the views. Nothing is allocated before the length
//! check passes, and per-view allocations are capped by the bytes actually
//! remaining, so a hostile length or count field cannot inflate memory use.

use base64::{engine::general_purpose, Engine as _};

use crate::template::{
    DecodedTemplate, FingerPosition, FingerView, Minutia, MinutiaKind, TemplateHeader,
};
use crate::util::{FormatError, FormatResult};

/// Format identifier followed by the 2005 revision tag.
pub(crate) const FORMAT_TAG: [u8; 8] = *b"FMR\0 20\0";
pub(crate) const HEADER_LEN: usize = 24;
pub(crate) const VIEW_HEADER_LEN: usize = 4;
pub(crate) const MINUTIA_LEN: usize = 6;

/// Upper bound on finger views in one record.
pub const MAX_VIEWS: usize = 16;

const COORD_MASK: u16 = 0x3FFF;

/// Big-endian cursor over an untrusted buffer.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> FormatResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(FormatError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn u8(&mut self) -> FormatResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> FormatResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> FormatResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Decodes a base64 record. ASCII whitespace (line wrapping) is ignored.
pub fn decode_base64(text: &str) -> FormatResult<DecodedTemplate> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = general_purpose::STANDARD.decode(compact.as_bytes())?;
    decode(&bytes)
}

/// Decodes a binary finger minutiae record.
pub fn decode(bytes: &[u8]) -> FormatResult<DecodedTemplate> {
    let mut reader = Reader::new(bytes);

    let tag = reader.take(FORMAT_TAG.len())?;
    if tag != FORMAT_TAG {
        let mut found = [0u8; 8];
        found.copy_from_slice(tag);
        return Err(FormatError::UnsupportedFormat { tag: found });
    }

    let record_length = reader.u32()?;
    if record_length as usize != bytes.len() {
        return Err(FormatError::LengthMismatch {
            declared: record_length,
            actual: bytes.len(),
        });
    }

    let equipment = reader.u16()?;
    let image_width = reader.u16()?;
    let image_height = reader.u16()?;
    let x_resolution = reader.u16()?;
    let y_resolution = reader.u16()?;
    let view_count = reader.u8()?;
    let _reserved = reader.u8()?;

    if view_count == 0 {
        return Err(FormatError::NoViews);
    }
    if view_count as usize > MAX_VIEWS {
        return Err(FormatError::TooManyViews {
            count: view_count as usize,
            max: MAX_VIEWS,
        });
    }

    let header = TemplateHeader {
        record_length,
        compliance: (equipment >> 12) as u8,
        capture_device_id: equipment & 0x0FFF,
        image_width,
        image_height,
        x_resolution,
        y_resolution,
        view_count,
    };

    let mut views = Vec::with_capacity(view_count as usize);
    for _ in 0..view_count {
        views.push(read_view(&mut reader, image_width, image_height)?);
    }

    if reader.remaining() != 0 {
        return Err(FormatError::TrailingBytes {
            count: reader.remaining(),
        });
    }

    Ok(DecodedTemplate::from_parts(header, views))
}

fn read_view(reader: &mut Reader<'_>, width: u16, height: u16) -> FormatResult<FingerView> {
    let position = FingerPosition(reader.u8()?);
    let view_impression = reader.u8()?;
    let quality = reader.u8()?;
    let count = reader.u8()? as usize;

    let capacity = count.min(reader.remaining() / MINUTIA_LEN);
    let mut minutiae = Vec::with_capacity(capacity);
    for _ in 0..count {
        let type_x = reader.u16()?;
        let y = reader.u16()? & COORD_MASK;
        let angle = reader.u8()?;
        let minutia_quality = reader.u8()?;
        let minutia = Minutia::new(
            type_x & COORD_MASK,
            y,
            angle,
            MinutiaKind::from_code(type_x >> 14),
        )
        .with_quality(minutia_quality)
        .bounded_by(width, height);
        minutiae.push(minutia);
    }

    let extended_len = reader.u16()? as usize;
    reader.take(extended_len)?;

    Ok(FingerView::from_parts(
        position,
        view_impression >> 4,
        view_impression & 0x0F,
        quality,
        minutiae,
    ))
}
