use std::io::BufWriter;

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::utils::calculate_points_for_circle;
use printpdf::{
    BuiltinFont, Color, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Polygon, Rgb,
};

use super::layout::{column_offsets, format_amount, format_percent, truncate};
use super::logo::PreparedLogo;
use crate::core::{HippoError, HippoResult, PageConfig};
use crate::models::InvoiceDocument;

const LOGO_WIDTH_MM: f32 = 30.0;
const LOGO_MAX_HEIGHT_MM: f32 = 40.0;
const AVATAR_RADIUS_MM: f32 = 8.0;
const DESCRIPTION_CHARS: usize = 34;
// space reserved under the table for the summary and footer blocks
const FOOTER_RESERVE_MM: f32 = 45.0;

struct Writer<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    cfg: &'a PageConfig,
    y: f32,
    pages: usize,
}

impl<'a> Writer<'a> {
    fn text(&self, text: &str, size: f32, x: f32) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), &self.font);
    }

    fn bold(&self, text: &str, size: f32, x: f32) {
        self.layer
            .use_text(text, size, Mm(x), Mm(self.y), &self.font_bold);
    }

    fn advance(&mut self, dy: f32) {
        self.y -= dy;
    }

    fn divider(&self) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(self.cfg.margin.left), Mm(self.y)), false),
                (
                    Point::new(Mm(self.cfg.width - self.cfg.margin.right), Mm(self.y)),
                    false,
                ),
            ],
            is_closed: false,
        });
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(self.cfg.width),
            Mm(self.cfg.height),
            format!("Page {}, Layer 1", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = self.cfg.top_y();
    }
}

/// Renders the invoice document to PDF bytes. The layout is a fixed A4
/// cursor layout: header, party blocks, paginated line-item table, summary
/// and footer.
pub fn render_pdf(
    document: &InvoiceDocument,
    logo: &PreparedLogo,
    cfg: &PageConfig,
) -> HippoResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Invoice {}", document.invoice_number),
        Mm(cfg.width),
        Mm(cfg.height),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| HippoError::render(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| HippoError::render(e.to_string()))?;

    let mut w = Writer {
        layer: doc.get_page(page).get_layer(layer),
        doc: &doc,
        font,
        font_bold,
        cfg,
        y: cfg.top_y(),
        pages: 1,
    };

    draw_header(&mut w, document, logo);
    draw_parties(&mut w, document);
    draw_table(&mut w, document);
    draw_summary(&mut w, document);
    draw_footer(&w, document);

    let mut writer = BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer)
        .map_err(|e| HippoError::render(e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| HippoError::render(e.to_string()))
}

/// Scale for the header logo: LOGO_WIDTH_MM wide, but never taller than
/// LOGO_MAX_HEIGHT_MM, so an extreme aspect ratio cannot push the header
/// off the page. Returns `(dpi, rendered height in mm)`.
fn logo_scale(px_w: u32, px_h: u32) -> (f32, f32) {
    let dpi_for_width = px_w as f32 * 25.4 / LOGO_WIDTH_MM;
    let dpi_for_height = px_h as f32 * 25.4 / LOGO_MAX_HEIGHT_MM;
    let dpi = dpi_for_width.max(dpi_for_height);
    (dpi, px_h as f32 * 25.4 / dpi)
}

fn draw_header(w: &mut Writer<'_>, document: &InvoiceDocument, logo: &PreparedLogo) {
    let left = w.cfg.margin.left;
    let right_col = w.cfg.width - w.cfg.margin.right - 65.0;
    let header_top = w.y;

    match logo {
        PreparedLogo::Image(img) => {
            let (px_w, px_h) = image::GenericImageView::dimensions(img);
            let (dpi, height_mm) = logo_scale(px_w, px_h);
            let pdf_image = printpdf::Image::from_dynamic_image(img);
            pdf_image.add_to_layer(
                w.layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(left)),
                    translate_y: Some(Mm(header_top - height_mm)),
                    dpi: Some(dpi),
                    ..Default::default()
                },
            );
            w.advance(height_mm + 6.0);
        }
        PreparedLogo::Initial(initial) => {
            let cx = left + AVATAR_RADIUS_MM;
            let cy = header_top - AVATAR_RADIUS_MM;
            w.layer
                .set_fill_color(Color::Rgb(Rgb::new(0.23, 0.51, 0.96, None)));
            let ring = calculate_points_for_circle(Mm(AVATAR_RADIUS_MM), Mm(cx), Mm(cy));
            w.layer.add_polygon(Polygon {
                rings: vec![ring],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
            w.layer
                .set_fill_color(Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None)));
            w.layer.use_text(
                initial.to_string(),
                16.0,
                Mm(cx - 2.0),
                Mm(cy - 2.0),
                &w.font_bold,
            );
            w.layer
                .set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
            w.advance(AVATAR_RADIUS_MM * 2.0 + 6.0);
        }
    }

    w.bold(&document.company.name, 14.0, left);
    w.advance(6.0);
    w.text(&document.company.address, w.cfg.body_size, left);
    w.advance(w.cfg.line_height);
    w.text(&document.company.email, w.cfg.body_size, left);
    w.advance(w.cfg.line_height);
    w.text(&document.company.phone, w.cfg.body_size, left);

    // invoice metadata on the right, aligned with the page top
    let saved_y = w.y;
    w.y = header_top;
    w.bold("INVOICE", w.cfg.title_size, right_col);
    w.advance(9.0);
    w.bold(&document.invoice_number, w.cfg.heading_size, right_col);
    w.advance(7.0);
    w.text(
        &format!("Issue date: {}", document.date),
        w.cfg.body_size,
        right_col,
    );
    w.advance(w.cfg.line_height);
    w.text(
        &format!("Due date: {}", document.due_date),
        w.cfg.body_size,
        right_col,
    );
    w.y = saved_y;

    w.advance(8.0);
    w.divider();
    w.advance(10.0);
}

fn draw_parties(w: &mut Writer<'_>, document: &InvoiceDocument) {
    let left = w.cfg.margin.left;
    let right_col = w.cfg.width - w.cfg.margin.right - 65.0;
    let block_top = w.y;

    w.bold("Bill To:", w.cfg.heading_size, left);
    w.advance(6.0);
    w.text(&document.customer.name, w.cfg.body_size, left);
    w.advance(w.cfg.line_height);
    w.text(&document.customer.address, w.cfg.body_size, left);
    w.advance(w.cfg.line_height);
    w.text(&document.customer.email, w.cfg.body_size, left);
    w.advance(w.cfg.line_height);
    w.text(&document.customer.phone, w.cfg.body_size, left);

    let saved_y = w.y;
    w.y = block_top;
    w.bold("Details:", w.cfg.heading_size, right_col);
    w.advance(6.0);
    w.text(
        &format!("Currency: {}", document.currency),
        w.cfg.body_size,
        right_col,
    );
    w.advance(w.cfg.line_height);
    w.text(
        &format!(
            "{}: {}",
            document.tax_type,
            format_percent(document.tax_rate)
        ),
        w.cfg.body_size,
        right_col,
    );
    w.y = saved_y;

    w.advance(12.0);
}

fn draw_table_header(w: &mut Writer<'_>, document: &InvoiceDocument) {
    let cols = column_offsets(w.cfg);
    w.bold("Description", w.cfg.body_size, cols[0]);
    w.bold("Date", w.cfg.body_size, cols[1]);
    w.bold("Qty", w.cfg.body_size, cols[2]);
    w.bold("Unit Price", w.cfg.body_size, cols[3]);
    w.bold(&format!("{} %", document.tax_type), w.cfg.body_size, cols[4]);
    w.bold("Amount", w.cfg.body_size, cols[5]);
    w.advance(2.5);
    w.divider();
    w.advance(6.0);
}

fn draw_table(w: &mut Writer<'_>, document: &InvoiceDocument) {
    let cols = column_offsets(w.cfg);
    let row_height = 6.0;

    draw_table_header(w, document);
    for item in &document.items {
        if w.y < w.cfg.margin.bottom + FOOTER_RESERVE_MM {
            w.new_page();
            draw_table_header(w, document);
        }
        w.text(
            &truncate(&item.description, DESCRIPTION_CHARS),
            w.cfg.body_size,
            cols[0],
        );
        w.text(&document.date.to_string(), w.cfg.body_size, cols[1]);
        w.text(&format_amount(item.quantity), w.cfg.body_size, cols[2]);
        w.text(&format_amount(item.unit_price), w.cfg.body_size, cols[3]);
        w.text(&format_percent(document.tax_rate), w.cfg.body_size, cols[4]);
        w.text(&format_amount(item.amount), w.cfg.body_size, cols[5]);
        w.advance(row_height);
    }
    w.advance(2.0);
    w.divider();
    w.advance(8.0);
}

fn draw_summary(w: &mut Writer<'_>, document: &InvoiceDocument) {
    if w.y < w.cfg.margin.bottom + FOOTER_RESERVE_MM {
        w.new_page();
    }
    let cols = column_offsets(w.cfg);
    let label_x = cols[3];
    let value_x = cols[5];

    w.text(
        &format!("Total excl. {}", document.tax_type),
        w.cfg.body_size,
        label_x,
    );
    w.text(&format_amount(document.subtotal), w.cfg.body_size, value_x);
    w.advance(w.cfg.line_height);

    w.text(
        &format!(
            "{} {}",
            document.tax_type,
            format_percent(document.tax_rate)
        ),
        w.cfg.body_size,
        label_x,
    );
    w.text(&format_amount(document.tax_amount), w.cfg.body_size, value_x);
    w.advance(w.cfg.line_height + 1.0);

    w.bold("Total amount due", 11.0, label_x);
    w.bold(
        &format!("{} {}", format_amount(document.total), document.currency),
        11.0,
        value_x,
    );
    w.advance(10.0);

    if let Some(notes) = &document.notes {
        if !notes.trim().is_empty() {
            w.bold("Notes:", w.cfg.heading_size, w.cfg.margin.left);
            w.advance(6.0);
            for line in notes.lines() {
                if w.y < w.cfg.margin.bottom + 25.0 {
                    break;
                }
                w.text(line, w.cfg.body_size, w.cfg.margin.left);
                w.advance(w.cfg.line_height);
            }
        }
    }
}

fn draw_footer(w: &Writer<'_>, document: &InvoiceDocument) {
    let left = w.cfg.margin.left;
    let mut y = w.cfg.margin.bottom + 12.0;

    if document.bank_name.is_some() || document.bank_account.is_some() {
        w.layer.use_text(
            "Payment details",
            w.cfg.body_size,
            Mm(left),
            Mm(y),
            &w.font_bold,
        );
        y -= w.cfg.line_height;
        let bank = [
            document.bank_name.as_deref(),
            document.bank_account.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" - ");
        w.layer
            .use_text(bank, w.cfg.small_size, Mm(left), Mm(y), &w.font);
        y -= w.cfg.line_height;
    }

    let contact = format!(
        "{} | {} | {}",
        document.company.name, document.company.email, document.company.phone
    );
    w.layer
        .use_text(contact, w.cfg.small_size, Mm(left), Mm(y), &w.font);
    y -= w.cfg.line_height;
    w.layer.use_text(
        "Thank you for your business!",
        w.cfg.small_size,
        Mm(left),
        Mm(y),
        &w.font,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentLine, InvoiceStatus, PartyBlock};
    use chrono::NaiveDate;

    fn document(items: usize) -> InvoiceDocument {
        InvoiceDocument {
            invoice_number: "INV-1001".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
            currency: "USD".to_string(),
            tax_type: "VAT".to_string(),
            tax_rate: 10.0,
            status: InvoiceStatus::Unpaid,
            company: PartyBlock {
                name: "Acme Corp".to_string(),
                address: "1 Main St".to_string(),
                email: "billing@acme.test".to_string(),
                phone: "+1 555 0100".to_string(),
            },
            logo_url: None,
            bank_name: Some("First Bank".to_string()),
            bank_account: Some("000123".to_string()),
            customer: PartyBlock {
                name: "Jane Doe".to_string(),
                address: "2 Side St".to_string(),
                email: "jane@example.test".to_string(),
                phone: "+1 555 0101".to_string(),
            },
            items: (0..items)
                .map(|i| DocumentLine {
                    description: format!("Line item {}", i + 1),
                    quantity: 2.0,
                    unit_price: 50.0,
                    amount: 100.0,
                })
                .collect(),
            subtotal: 100.0 * items as f64,
            tax_amount: 10.0 * items as f64,
            total: 110.0 * items as f64,
            notes: Some("Payable within 30 days.".to_string()),
        }
    }

    #[test]
    fn renders_a_pdf_with_the_avatar_fallback() {
        let bytes = render_pdf(
            &document(3),
            &PreparedLogo::Initial('A'),
            &PageConfig::default(),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_invoices_paginate_instead_of_failing() {
        let short = render_pdf(
            &document(2),
            &PreparedLogo::Initial('A'),
            &PageConfig::default(),
        )
        .unwrap();
        let long = render_pdf(
            &document(80),
            &PreparedLogo::Initial('A'),
            &PageConfig::default(),
        )
        .unwrap();
        assert!(long.len() > short.len());
    }

    #[test]
    fn renders_with_an_embedded_logo() {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(60, 24));
        let bytes = render_pdf(
            &document(1),
            &PreparedLogo::Image(img),
            &PageConfig::default(),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn logo_scale_clamps_both_dimensions() {
        // wide logo fills the column width
        let (dpi, height) = logo_scale(600, 240);
        assert!((600.0 * 25.4 / dpi - LOGO_WIDTH_MM).abs() < 1e-3);
        assert!(height <= LOGO_MAX_HEIGHT_MM + 1e-3);

        // an extremely tall logo is capped by height, not width
        let (_, height) = logo_scale(100, 4000);
        assert!((height - LOGO_MAX_HEIGHT_MM).abs() < 1e-3);
    }

    #[test]
    fn tall_logos_stay_within_the_header() {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(100, 4000));
        let bytes = render_pdf(
            &document(2),
            &PreparedLogo::Image(img),
            &PageConfig::default(),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
