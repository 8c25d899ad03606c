//! Record serialization and construction.

use base64::{engine::general_purpose, Engine as _};

use crate::template::decode::{FORMAT_TAG, HEADER_LEN, MAX_VIEWS, MINUTIA_LEN, VIEW_HEADER_LEN};
use crate::template::{DecodedTemplate, FingerView, TemplateHeader};
use crate::util::{FormatError, FormatResult};

/// Largest minutia count a view header can declare.
const MAX_VIEW_MINUTIAE: usize = u8::MAX as usize;

/// Largest coordinate the 14-bit position fields hold.
const MAX_COORDINATE: u16 = 0x3FFF;

/// Assembles a [`DecodedTemplate`] with a consistent header.
///
/// The record length and view count are derived from the views, and the
/// out-of-bounds flag of every minutia is recomputed against the image size,
/// exactly as the decoder would report it. Records hold between one and
/// [`MAX_VIEWS`] views of at most 255 minutiae each, with coordinates below
/// 16384; [`TemplateBuilder::build`] rejects anything else so the result
/// always serializes without loss.
#[derive(Clone, Debug)]
pub struct TemplateBuilder {
    image_width: u16,
    image_height: u16,
    x_resolution: u16,
    y_resolution: u16,
    compliance: u8,
    capture_device_id: u16,
    views: Vec<FingerView>,
}

impl TemplateBuilder {
    /// Starts a record for an image of the given size (197 px/cm resolution).
    pub fn new(image_width: u16, image_height: u16) -> Self {
        Self {
            image_width,
            image_height,
            x_resolution: 197,
            y_resolution: 197,
            compliance: 0,
            capture_device_id: 0,
            views: Vec::new(),
        }
    }

    pub fn resolution(mut self, x: u16, y: u16) -> Self {
        self.x_resolution = x;
        self.y_resolution = y;
        self
    }

    /// Capture equipment: 4-bit compliance and 12-bit device id.
    pub fn capture_device(mut self, compliance: u8, device_id: u16) -> Self {
        self.compliance = compliance & 0x0F;
        self.capture_device_id = device_id & 0x0FFF;
        self
    }

    pub fn view(mut self, view: FingerView) -> Self {
        self.views.push(view);
        self
    }

    pub fn build(self) -> FormatResult<DecodedTemplate> {
        if self.views.is_empty() {
            return Err(FormatError::NoViews);
        }
        if self.views.len() > MAX_VIEWS {
            return Err(FormatError::TooManyViews {
                count: self.views.len(),
                max: MAX_VIEWS,
            });
        }
        for (index, view) in self.views.iter().enumerate() {
            let count = view.minutiae().len();
            if count > MAX_VIEW_MINUTIAE {
                return Err(FormatError::TooManyMinutiae {
                    view: index,
                    count,
                    max: MAX_VIEW_MINUTIAE,
                });
            }
            if let Some(m) = view
                .minutiae()
                .iter()
                .find(|m| m.x() > MAX_COORDINATE || m.y() > MAX_COORDINATE)
            {
                return Err(FormatError::CoordinateOutOfRange {
                    view: index,
                    x: m.x(),
                    y: m.y(),
                });
            }
        }

        let (width, height) = (self.image_width, self.image_height);
        let views: Vec<FingerView> = self
            .views
            .into_iter()
            .map(|view| {
                let minutiae = view
                    .minutiae()
                    .iter()
                    .map(|m| m.bounded_by(width, height))
                    .collect();
                FingerView::from_parts(
                    view.position(),
                    view.view_number(),
                    view.impression_type(),
                    view.quality(),
                    minutiae,
                )
            })
            .collect();

        let body: usize = views
            .iter()
            .map(|v| VIEW_HEADER_LEN + v.minutiae().len() * MINUTIA_LEN + 2)
            .sum();
        let header = TemplateHeader {
            record_length: (HEADER_LEN + body) as u32,
            compliance: self.compliance,
            capture_device_id: self.capture_device_id,
            image_width: width,
            image_height: height,
            x_resolution: self.x_resolution,
            y_resolution: self.y_resolution,
            view_count: views.len() as u8,
        };
        Ok(DecodedTemplate::from_parts(header, views))
    }
}

impl DecodedTemplate {
    /// Serializes the record in the binary layout [`crate::decode`] reads.
    ///
    /// Extended data blocks are not retained by the decoder and are written
    /// as empty.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = self.header();
        let mut out = Vec::with_capacity(header.record_length as usize);
        out.extend_from_slice(&FORMAT_TAG);
        out.extend_from_slice(&header.record_length.to_be_bytes());
        let equipment = ((header.compliance as u16) << 12) | (header.capture_device_id & 0x0FFF);
        out.extend_from_slice(&equipment.to_be_bytes());
        out.extend_from_slice(&header.image_width.to_be_bytes());
        out.extend_from_slice(&header.image_height.to_be_bytes());
        out.extend_from_slice(&header.x_resolution.to_be_bytes());
        out.extend_from_slice(&header.y_resolution.to_be_bytes());
        out.push(header.view_count);
        out.push(0);

        for view in self.views() {
            out.push(view.position().0);
            out.push((view.view_number() << 4) | (view.impression_type() & 0x0F));
            out.push(view.quality());
            out.push(view.minutiae().len() as u8);
            for m in view.minutiae() {
                let type_x = (m.kind().code() << 14) | (m.x() & 0x3FFF);
                out.extend_from_slice(&type_x.to_be_bytes());
                out.extend_from_slice(&(m.y() & 0x3FFF).to_be_bytes());
                out.push(m.angle());
                out.push(m.quality().unwrap_or(0));
            }
            out.extend_from_slice(&0u16.to_be_bytes());
        }
        out
    }

    /// Serializes to standard padded base64.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.to_bytes())
    }
}
