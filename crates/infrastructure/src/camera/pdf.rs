use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use std::io::Cursor;

const POINTS_PER_PIXEL: f32 = 72.0 / 96.0;

/// Wraps a JPEG into a single-page PDF whose page size equals the image's
/// pixel dimensions (one point per pixel, matching the original's
/// `reportlab` call with `pagesize=(w, h)`).
pub fn to_single_page_pdf(jpeg_bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let decoded = image::load_from_memory_with_format(jpeg_bytes, image::ImageFormat::Jpeg)?;
    let (width_px, height_px) = (decoded.width(), decoded.height());

    let page_width = Mm::from(printpdf::Pt(width_px as f32 * POINTS_PER_PIXEL));
    let page_height = Mm::from(printpdf::Pt(height_px as f32 * POINTS_PER_PIXEL));

    let (doc, page_idx, layer_idx) =
        PdfDocument::new("snapshot", page_width, page_height, "snapshot-layer");
    let layer = doc.get_page(page_idx).get_layer(layer_idx);

    let image = Image::try_from(image::codecs::jpeg::JpegDecoder::new(Cursor::new(
        jpeg_bytes,
    ))?)?;
    image.add_to_layer(layer, ImageTransform::default());

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_per_pixel_matches_96_dpi_assumption() {
        assert!((POINTS_PER_PIXEL - 0.75).abs() < f32::EPSILON);
    }
}
