//! Image XObjects for embedding uploaded photos in a report.

use image::{ColorType, DynamicImage, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::{Error, Result};

/// An image ready to be added to a document.
#[derive(Debug)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    image: Stream,
    soft_mask: Option<Stream>,
}

impl EmbeddedImage {
    /// Decode `bytes` and build the PDF image stream(s) for it.
    ///
    /// Baseline JPEGs in gray or RGB are passed through untouched; anything
    /// else is re-encoded as 8-bit RGB (plus a gray soft mask for alpha).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes).map_err(|e| Error::ImageDecode(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| Error::ImageDecode(e.to_string()))?;

        debug!(
            "Embedding {:?} image {}x{} ({:?})",
            format,
            decoded.width(),
            decoded.height(),
            decoded.color()
        );

        if format == ImageFormat::Jpeg
            && let Some(color_space) = jpeg_color_space(decoded.color())
        {
            return Ok(Self::passthrough_jpeg(bytes, &decoded, color_space));
        }

        Ok(Self::reencode(&decoded))
    }

    fn passthrough_jpeg(bytes: &[u8], decoded: &DynamicImage, color_space: &str) -> Self {
        let mut dict = image_dictionary(decoded.width(), decoded.height(), color_space);
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

        Self {
            width: decoded.width(),
            height: decoded.height(),
            image: Stream::new(dict, bytes.to_vec()).with_compression(false),
            soft_mask: None,
        }
    }

    fn reencode(decoded: &DynamicImage) -> Self {
        let (width, height) = (decoded.width(), decoded.height());
        let rgb = decoded.to_rgb8().into_raw();

        let soft_mask = decoded.color().has_alpha().then(|| {
            let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p.0[3]).collect();
            Stream::new(image_dictionary(width, height, "DeviceGray"), alpha)
        });

        Self {
            width,
            height,
            image: Stream::new(image_dictionary(width, height, "DeviceRGB"), rgb),
            soft_mask,
        }
    }

    /// Add the image (and its mask) to `doc`, returning the image's id.
    pub fn add_to(self, doc: &mut Document) -> ObjectId {
        let mut image = self.image;
        if let Some(mask) = self.soft_mask {
            let mask_id = doc.add_object(Object::Stream(mask));
            image.dict.set("SMask", Object::Reference(mask_id));
        }
        doc.add_object(Object::Stream(image))
    }

    /// Size of the image scaled to fit a `box_size` square, aspect preserved.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(&self, box_size: f32) -> (f32, f32) {
        let (w, h) = (self.width as f32, self.height as f32);
        let scale = (box_size / w).min(box_size / h);
        (w * scale, h * scale)
    }
}

const fn jpeg_color_space(color: ColorType) -> Option<&'static str> {
    match color {
        ColorType::L8 => Some("DeviceGray"),
        ColorType::Rgb8 => Some("DeviceRGB"),
        _ => None,
    }
}

fn image_dictionary(width: u32, height: u32, color_space: &str) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(i64::from(width))),
        ("Height", Object::Integer(i64::from(height))),
        ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ])
}
