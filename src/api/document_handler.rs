use actix_web::{web, HttpRequest, HttpResponse};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use flate2::read::GzDecoder;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::io::Read;

use super::error::{ApiError, ApiResult};
use super::handlers::{check_rate_limit, load_customer, load_items, owned_invoice};
use super::middleware::auth::auth_info;
use super::state::ApiState;
use super::PDF_RENDERS;
use crate::core::PageConfig;
use crate::models::InvoiceDocument;
use crate::render::{self, PreparedLogo};

#[derive(Debug, Deserialize)]
pub struct PdfOptions {
    #[serde(default)]
    pub disposition: Option<String>,
}

pub(crate) async fn build_document(
    state: &ApiState,
    user_id: &str,
    invoice_id: &str,
) -> ApiResult<InvoiceDocument> {
    let (invoice, company) = owned_invoice(state, user_id, invoice_id).await?;
    let customer = load_customer(state, &invoice.company_id, &invoice.customer_id).await?;
    let items = load_items(state, &invoice.id).await?;
    Ok(InvoiceDocument::build(&invoice, &items, &company, &customer))
}

pub(crate) async fn render_document_pdf(
    state: &ApiState,
    document: InvoiceDocument,
) -> ApiResult<Vec<u8>> {
    let logo = render::prepare_logo(
        &state.http,
        document.logo_url.as_deref(),
        document.company_initial(),
        state.config.logo_fetch_timeout_ms,
        state.config.max_capture_bytes,
    )
    .await;

    // PDF assembly is CPU-bound; keep it off the reactor
    let bytes = web::block(move || render::render_pdf(&document, &logo, &PageConfig::default()))
        .await??;
    PDF_RENDERS.inc();
    Ok(bytes)
}

/// `GET /invoices/{id}/pdf?disposition=inline|attachment`
pub async fn get_invoice_pdf(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<PdfOptions>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    if let Some(limited) = check_rate_limit(&state, &info.user_id) {
        return Ok(limited);
    }

    let document = build_document(&state, &info.user_id, &path.into_inner()).await?;
    let file_name = document.file_name();
    let bytes = render_document_pdf(&state, document).await?;

    let disposition = match query.disposition.as_deref() {
        Some("inline") => format!("inline; filename=\"{file_name}\""),
        _ => format!("attachment; filename=\"{file_name}\""),
    };
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .append_header(("Content-Disposition", disposition))
        .body(bytes::Bytes::from(bytes)))
}

/// `GET /invoices/{id}/preview` — server-rendered HTML of the same document.
pub async fn get_invoice_preview(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let document = build_document(&state, &info.user_id, &path.into_inner()).await?;

    let logo = render::prepare_logo(
        &state.http,
        document.logo_url.as_deref(),
        document.company_initial(),
        state.config.logo_fetch_timeout_ms,
        state.config.max_capture_bytes,
    )
    .await;
    let logo_data_url = match &logo {
        PreparedLogo::Image(img) => render::logo::data_url(img),
        PreparedLogo::Initial(_) => None,
    };

    let html = render::render_preview(&document, logo_data_url.as_deref())?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html))
}

/// `GET /invoices/{id}/share-message` — text for the external share action.
pub async fn get_share_message(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let document = build_document(&state, &info.user_id, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": document.share_message(),
        "compose_url": document.compose_url(),
        "file_name": document.file_name(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    /// Base64-encoded page bitmaps (PNG or JPEG), in page order.
    pub pages: Vec<String>,
}

/// `POST /invoices/{id}/capture` — the rasterized-capture export path.
/// Accepts an optionally gzip-compressed JSON body of page bitmaps and
/// returns them embedded one-per-page in a PDF.
pub async fn capture_invoice_pdf(
    req: HttpRequest,
    path: web::Path<String>,
    mut payload: web::Payload,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    if let Some(limited) = check_rate_limit(&state, &info.user_id) {
        return Ok(limited);
    }
    let (invoice, _) = owned_invoice(&state, &info.user_id, &path.into_inner()).await?;

    let max_size = state.config.max_capture_bytes;
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > max_size {
            return Ok(HttpResponse::PayloadTooLarge().json(json!({
                "error": "Capture too large",
                "max_size_mb": max_size / 1_048_576
            })));
        }
        body.extend_from_slice(&chunk);
    }

    let content_encoding = req
        .headers()
        .get("Content-Encoding")
        .and_then(|h| h.to_str().ok());
    let decompressed = match content_encoding {
        Some("gzip") => {
            let mut decoder = GzDecoder::new(&body[..]);
            let mut decompressed = Vec::new();
            decoder.read_to_end(&mut decompressed)?;
            decompressed
        }
        _ => body.to_vec(),
    };

    let request: CaptureRequest = serde_json::from_slice(&decompressed)?;
    let mut pages = Vec::with_capacity(request.pages.len());
    for (i, encoded) in request.pages.iter().enumerate() {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| ApiError::bad_request(format!("page {} is not valid base64", i + 1)))?;
        pages.push(bytes);
    }

    let file_name = format!("invoice-{}.pdf", invoice.invoice_number);
    let number = invoice.invoice_number.clone();
    let bytes = web::block(move || render::build_capture_pdf(&number, &pages)).await??;
    PDF_RENDERS.inc();

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .append_header((
            "Content-Disposition",
            format!("attachment; filename=\"{file_name}\""),
        ))
        .body(bytes::Bytes::from(bytes)))
}
