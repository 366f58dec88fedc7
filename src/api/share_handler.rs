use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use super::error::ApiResult;
use super::handlers::{check_rate_limit, owned_invoice};
use super::middleware::auth::auth_info;
use super::state::ApiState;
use super::SHARE_RESOLUTIONS;
use crate::core::{HippoError, HippoResult, PageConfig};
use crate::models::{Company, Customer, Invoice, InvoiceDocument, InvoiceItem, InvoiceShare};
use crate::render::{self, PreparedLogo};
use crate::storage::{from_row, insert_as, Filter};

/// `POST /invoices/{id}/share` — mints a fresh token for the invoice. Old
/// tokens stay valid until their own expiry.
pub async fn create_share(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let (invoice, _) = owned_invoice(&state, &info.user_id, &path.into_inner()).await?;

    let share = InvoiceShare::issue(&invoice.id, state.config.share_expiry_days);
    let share = insert_as(state.store.as_ref(), "invoice_shares", &share).await?;

    let url = format!(
        "{}/invoice/share/{}",
        state.config.share_base_url.trim_end_matches('/'),
        share.token
    );
    Ok(HttpResponse::Created().json(json!({
        "token": share.token,
        "url": url,
        "expires_at": share.expires_at,
    })))
}

/// Resolves a token without any authentication. The token itself is the
/// authorization; it binds to exactly one invoice.
async fn resolve_share(state: &ApiState, token: &str) -> HippoResult<InvoiceShare> {
    let rows = state
        .store
        .select("invoice_shares", &[Filter::eq("token", token)])
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| HippoError::not_found("share"))?;
    let share: InvoiceShare = from_row(row)?;
    if share.is_expired(chrono::Utc::now()) {
        return Err(HippoError::ShareExpired);
    }
    Ok(share)
}

async fn shared_document(state: &ApiState, token: &str) -> HippoResult<InvoiceDocument> {
    let share = resolve_share(state, token).await?;

    let invoice: Invoice = single(state, "invoices", "id", &share.invoice_id, "invoice").await?;
    let company: Company =
        single(state, "companies", "id", &invoice.company_id, "company").await?;
    let customer: Customer =
        single(state, "customers", "id", &invoice.customer_id, "customer").await?;
    let items: Vec<InvoiceItem> = state
        .store
        .select("invoice_items", &[Filter::eq("invoice_id", &*invoice.id)])
        .await?
        .into_iter()
        .map(from_row)
        .collect::<Result<_, _>>()?;

    Ok(InvoiceDocument::build(&invoice, &items, &company, &customer))
}

async fn single<T: serde::de::DeserializeOwned>(
    state: &ApiState,
    table: &str,
    field: &str,
    value: &str,
    what: &str,
) -> HippoResult<T> {
    let rows = state.store.select(table, &[Filter::eq(field, value)]).await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| HippoError::not_found(what))?;
    Ok(from_row(row)?)
}

/// Rate-limit key for the unauthenticated routes. Keying by peer address
/// keeps the limiter's state bounded by clients, not by probed tokens.
fn client_key(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn share_error_response(err: &HippoError) -> HttpResponse {
    match err {
        HippoError::NotFound(_) => {
            SHARE_RESOLUTIONS.with_label_values(&["not_found"]).inc();
            HttpResponse::NotFound()
                .content_type("text/html; charset=utf-8")
                .body(render::render_error_page(
                    "Invoice Not Found",
                    "Invalid or expired share link",
                ))
        }
        HippoError::ShareExpired => {
            SHARE_RESOLUTIONS.with_label_values(&["expired"]).inc();
            HttpResponse::Gone()
                .content_type("text/html; charset=utf-8")
                .body(render::render_error_page(
                    "Share Link Expired",
                    "This share link has expired. Ask the sender for a new one.",
                ))
        }
        _ => {
            tracing::error!("share resolution failed: {err}");
            HttpResponse::InternalServerError()
                .content_type("text/html; charset=utf-8")
                .body(render::render_error_page(
                    "Something Went Wrong",
                    "The invoice could not be loaded. Please try again.",
                ))
        }
    }
}

/// `GET /invoice/share/{token}` — the public read-only invoice page.
pub async fn public_share_page(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> HttpResponse {
    let token = path.into_inner();
    if let Some(limited) = check_rate_limit(&state, &client_key(&req)) {
        return limited;
    }

    let document = match shared_document(&state, &token).await {
        Ok(document) => document,
        Err(err) => return share_error_response(&err),
    };
    SHARE_RESOLUTIONS.with_label_values(&["ok"]).inc();

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

    match render::render_preview(&document, logo_data_url.as_deref()) {
        Ok(html) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html),
        Err(err) => share_error_response(&err),
    }
}

/// `GET /invoice/share/{token}/pdf` — the same document as an inline PDF.
pub async fn public_share_pdf(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> HttpResponse {
    let token = path.into_inner();
    if let Some(limited) = check_rate_limit(&state, &client_key(&req)) {
        return limited;
    }

    let document = match shared_document(&state, &token).await {
        Ok(document) => document,
        Err(err) => return share_error_response(&err),
    };
    SHARE_RESOLUTIONS.with_label_values(&["ok"]).inc();

    let file_name = document.file_name();
    let logo = render::prepare_logo(
        &state.http,
        document.logo_url.as_deref(),
        document.company_initial(),
        state.config.logo_fetch_timeout_ms,
        state.config.max_capture_bytes,
    )
    .await;

    let rendered =
        web::block(move || render::render_pdf(&document, &logo, &PageConfig::default())).await;
    match rendered {
        Ok(Ok(bytes)) => HttpResponse::Ok()
            .content_type("application/pdf")
            .append_header((
                "Content-Disposition",
                format!("inline; filename=\"{file_name}\""),
            ))
            .body(bytes::Bytes::from(bytes)),
        Ok(Err(err)) => share_error_response(&err),
        Err(err) => share_error_response(&HippoError::render(err.to_string())),
    }
}
