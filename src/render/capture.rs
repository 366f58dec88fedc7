use printpdf::{ImageTransform, Mm, PdfDocument};

use crate::core::{HippoError, HippoResult};

const PAGE_WIDTH_MM: f32 = 210.0;

/// Capture pages keep the bitmap's aspect ratio at full page width.
pub fn capture_page_height(px_width: u32, px_height: u32) -> f32 {
    px_height as f32 * PAGE_WIDTH_MM / px_width as f32
}

/// Fallback export path for clients that rasterize the preview themselves:
/// each posted bitmap becomes one PDF page, scaled to the full page width.
pub fn build_capture_pdf(invoice_number: &str, pages: &[Vec<u8>]) -> HippoResult<Vec<u8>> {
    if pages.is_empty() {
        return Err(HippoError::validation("capture needs at least one page"));
    }

    let mut decoded = Vec::with_capacity(pages.len());
    for (i, bytes) in pages.iter().enumerate() {
        let img = image::load_from_memory(bytes).map_err(|e| {
            HippoError::validation(format!("page {} is not a decodable image: {e}", i + 1))
        })?;
        decoded.push(img);
    }

    let first = &decoded[0];
    let (w0, h0) = image::GenericImageView::dimensions(first);
    let (doc, mut page, mut layer) = PdfDocument::new(
        format!("Invoice {invoice_number}"),
        Mm(PAGE_WIDTH_MM),
        Mm(capture_page_height(w0, h0)),
        "Layer 1",
    );

    for (i, img) in decoded.iter().enumerate() {
        let (px_w, _) = image::GenericImageView::dimensions(img);
        if i > 0 {
            let (px_w, px_h) = image::GenericImageView::dimensions(img);
            let (next_page, next_layer) = doc.add_page(
                Mm(PAGE_WIDTH_MM),
                Mm(capture_page_height(px_w, px_h)),
                format!("Page {}, Layer 1", i + 1),
            );
            page = next_page;
            layer = next_layer;
        }
        let target = doc.get_page(page).get_layer(layer);
        let dpi = px_w as f32 * 25.4 / PAGE_WIDTH_MM;
        // re-encode through the image crate normalizes whatever the client
        // rasterized (PNG or JPEG) into one embedded format
        let pdf_image = printpdf::Image::from_dynamic_image(img);
        pdf_image.add_to_layer(
            target,
            ImageTransform {
                translate_x: Some(Mm(0.0)),
                translate_y: Some(Mm(0.0)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }

    let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer)
        .map_err(|e| HippoError::render(e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| HippoError::render(e.to_string()))
}
