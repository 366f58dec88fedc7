use std::sync::Arc;

use actix_web::{test, web, App};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use hippo::api::state::AppConfig;
use hippo::api::{configure_routes, ApiState};
use hippo::auth::StaticSessionProvider;
use hippo::models::{Company, Customer, InvoiceShare};
use hippo::storage::{insert_as, SqliteStore};

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";

async fn test_state() -> web::Data<ApiState> {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let sessions = Arc::new(
        StaticSessionProvider::new()
            .with_token(ALICE, "alice", "alice@example.test")
            .with_token(BOB, "bob", "bob@example.test"),
    );
    let config = AppConfig {
        rate_limit_per_minute: 10_000,
        rate_limit_burst: 1_000,
        ..Default::default()
    };
    web::Data::new(ApiState::with_parts(
        store,
        sessions,
        reqwest::Client::new(),
        config,
    ))
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

async fn seed_company(state: &ApiState, user_id: &str, logo_url: Option<&str>) -> Company {
    insert_as(
        state.store.as_ref(),
        "companies",
        &Company {
            id: String::new(),
            user_id: user_id.to_string(),
            name: "Acme Corp".to_string(),
            address: "1 Main St".to_string(),
            phone: "+1 555 0100".to_string(),
            email: "billing@acme.test".to_string(),
            logo_url: logo_url.map(str::to_string),
            bank_name: Some("First Bank".to_string()),
            bank_account: Some("000123".to_string()),
            created_at: Utc::now(),
        },
    )
    .await
    .unwrap()
}

async fn seed_customer(state: &ApiState, company_id: &str) -> Customer {
    insert_as(
        state.store.as_ref(),
        "customers",
        &Customer {
            id: String::new(),
            company_id: company_id.to_string(),
            name: "Jane Doe".to_string(),
            email: "jane@example.test".to_string(),
            phone: "+1 555 0101".to_string(),
            address: "2 Side St".to_string(),
            created_at: Utc::now(),
        },
    )
    .await
    .unwrap()
}

fn invoice_request(company_id: &str, customer_id: &str, items: Value, tax_rate: f64) -> Value {
    json!({
        "company_id": company_id,
        "customer_id": customer_id,
        "date": "2024-01-15",
        "due_date": "2024-02-15",
        "tax_rate": tax_rate,
        "items": items,
    })
}

#[actix_web::test]
async fn health_and_readiness() {
    let state = test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert!(resp.status().is_success());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/ready").to_request()).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn api_requires_a_bearer_token() {
    let state = test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/companies").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn company_crud_is_scoped_to_the_owner() {
    let state = test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/companies")
            .insert_header(bearer(ALICE))
            .set_json(json!({
                "name": "Acme Corp",
                "address": "1 Main St",
                "phone": "+1 555 0100",
                "email": "billing@acme.test"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let company: Value = test::read_body_json(resp).await;
    let company_id = company["id"].as_str().unwrap().to_string();

    // the owner sees it
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/companies")
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    let listed: Value = test::read_body_json(resp).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // another user does not
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/companies/{company_id}"))
            .insert_header(bearer(BOB))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/companies")
            .insert_header(bearer(BOB))
            .to_request(),
    )
    .await;
    let listed: Value = test::read_body_json(resp).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn invoice_creation_computes_totals_server_side() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 2.0, "unit_price": 50.0 }]),
                10.0,
            ))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["invoice"]["subtotal"], json!(100.0));
    assert_eq!(body["invoice"]["tax_amount"], json!(10.0));
    assert_eq!(body["invoice"]["total"], json!(110.0));
    assert_eq!(body["invoice"]["status"], json!("unpaid"));
    assert!(body["invoice"]["invoice_number"]
        .as_str()
        .unwrap()
        .starts_with("INV-"));
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["amount"], json!(100.0));
}

#[actix_web::test]
async fn empty_invoices_are_rejected_before_persisting() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(&company.id, &customer.id, json!([]), 10.0))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);

    // nothing was persisted
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/invoices?company_id={}", company.id))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    let listed: Value = test::read_body_json(resp).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn non_positive_items_are_rejected() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 0.0, "unit_price": 50.0 }]),
                0.0,
            ))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn cumulative_payments_settle_after_the_second_payment() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 1.0, "unit_price": 100.0 }]),
                0.0,
            ))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let invoice_id = body["invoice"]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/invoices/{invoice_id}/payments"))
            .insert_header(bearer(ALICE))
            .set_json(json!({
                "amount": 30.0,
                "payment_date": "2024-03-01",
                "payment_method": "bank_transfer"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["invoice_status"], json!("unpaid"));
    assert_eq!(body["balance_due"], json!(70.0));

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/invoices/{invoice_id}/payments"))
            .insert_header(bearer(ALICE))
            .set_json(json!({
                "amount": 70.0,
                "payment_date": "2024-03-10",
                "payment_method": "cash"
            }))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["invoice_status"], json!("paid"));
    assert_eq!(body["balance_due"], json!(0.0));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/invoices/{invoice_id}"))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["invoice"]["status"], json!("paid"));
    assert_eq!(body["payments"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn mark_unpaid_clears_the_payment_details() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 1.0, "unit_price": 100.0 }]),
                0.0,
            ))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let invoice_id = body["invoice"]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/invoices/{invoice_id}/status"))
            .insert_header(bearer(ALICE))
            .set_json(json!({
                "status": "paid",
                "payment_method": "cash",
                "payment_remarks": "paid in person"
            }))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/invoices/{invoice_id}"))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["invoice"]["status"], json!("paid"));
    assert_eq!(body["invoice"]["payment_method"], json!("cash"));

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/invoices/{invoice_id}/status"))
            .insert_header(bearer(ALICE))
            .set_json(json!({ "status": "unpaid" }))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/invoices/{invoice_id}"))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["invoice"]["status"], json!("unpaid"));
    assert!(body["invoice"]["payment_method"].is_null());
}

#[actix_web::test]
async fn share_links_resolve_without_auth_and_are_idempotent() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 2.0, "unit_price": 50.0 }]),
                10.0,
            ))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let invoice_id = body["invoice"]["id"].as_str().unwrap().to_string();
    let invoice_number = body["invoice"]["invoice_number"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/invoices/{invoice_id}/share"))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let share: Value = test::read_body_json(resp).await;
    let token = share["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 32);
    assert!(share["expires_at"].is_string());

    // resolving twice yields the same document, with no auth header
    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/invoice/share/{token}"))
                .to_request(),
        )
        .await;
        assert!(resp.status().is_success());
        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains(&invoice_number));
        assert!(html.contains("110.00"));
    }

    // the PDF flavor of the same route
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/invoice/share/{token}/pdf"))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body = test::read_body(resp).await;
    assert!(body.starts_with(b"%PDF"));
}

#[actix_web::test]
async fn expired_share_tokens_fail_even_when_the_invoice_exists() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 1.0, "unit_price": 100.0 }]),
                0.0,
            ))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let invoice_id = body["invoice"]["id"].as_str().unwrap().to_string();

    let mut share = InvoiceShare::issue(&invoice_id, 7);
    share.expires_at = Some(Utc::now() - Duration::hours(1));
    let share = insert_as(state.store.as_ref(), "invoice_shares", &share)
        .await
        .unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/invoice/share/{}", share.token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 410);

    // the invoice itself is still there for its owner
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/invoices/{invoice_id}"))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn unknown_share_tokens_are_not_found() {
    let state = test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/invoice/share/doesnotexist0000000000000000000")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(html.contains("Invalid or expired share link"));
}

#[actix_web::test]
async fn deleting_an_invoice_with_no_children_succeeds() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 1.0, "unit_price": 100.0 }]),
                0.0,
            ))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let invoice_id = body["invoice"]["id"].as_str().unwrap().to_string();

    // remove the items so the invoice has zero attached rows
    use hippo::storage::Filter;
    state
        .store
        .delete("invoice_items", &[Filter::eq("invoice_id", invoice_id.clone())])
        .await
        .unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/v1/invoices/{invoice_id}"))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/invoices/{invoice_id}"))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn pdf_and_preview_fall_back_to_the_initials_avatar() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await; // no logo_url
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 2.0, "unit_price": 50.0 }]),
                10.0,
            ))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let invoice_id = body["invoice"]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/invoices/{invoice_id}/pdf"))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "application/pdf"
    );
    let disposition = resp
        .headers()
        .get("Content-Disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"invoice-"));
    let body = test::read_body(resp).await;
    assert!(body.starts_with(b"%PDF"));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/invoices/{invoice_id}/preview"))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(html.contains(r#"<div class="avatar">A</div>"#));
}

#[actix_web::test]
async fn capture_embeds_posted_bitmaps_into_a_pdf() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 1.0, "unit_price": 100.0 }]),
                0.0,
            ))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let invoice_id = body["invoice"]["id"].as_str().unwrap().to_string();

    // a tiny rasterized "page"
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(100, 141))
        .write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageOutputFormat::Png,
        )
        .unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/invoices/{invoice_id}/capture"))
            .insert_header(bearer(ALICE))
            .set_json(json!({ "pages": [BASE64.encode(&png)] }))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body = test::read_body(resp).await;
    assert!(body.starts_with(b"%PDF"));
}

#[actix_web::test]
async fn capture_accepts_a_gzip_compressed_body() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 1.0, "unit_price": 100.0 }]),
                0.0,
            ))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let invoice_id = body["invoice"]["id"].as_str().unwrap().to_string();

    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(100, 141))
        .write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageOutputFormat::Png,
        )
        .unwrap();
    let json_body = json!({ "pages": [BASE64.encode(&png)] }).to_string();

    let mut encoder =
        flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    std::io::Write::write_all(&mut encoder, json_body.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/invoices/{invoice_id}/capture"))
            .insert_header(bearer(ALICE))
            .insert_header(("Content-Encoding", "gzip"))
            .set_payload(compressed)
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body = test::read_body(resp).await;
    assert!(body.starts_with(b"%PDF"));
}

#[actix_web::test]
async fn public_share_rate_limit_is_per_client_not_per_token() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let sessions = Arc::new(StaticSessionProvider::new().with_token(
        ALICE,
        "alice",
        "alice@example.test",
    ));
    let config = AppConfig {
        rate_limit_per_minute: 1,
        rate_limit_burst: 1,
        ..Default::default()
    };
    let state = web::Data::new(ApiState::with_parts(
        store,
        sessions,
        reqwest::Client::new(),
        config,
    ));
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    // trying a second token does not get a fresh budget
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/invoice/share/guessAAAAAAAAAAAAAAAAAAAAAAAAAAA")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/invoice/share/guessBBBBBBBBBBBBBBBBBBBBBBBBBBB")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 429);
}

#[actix_web::test]
async fn share_message_carries_number_issuer_amount_and_due_date() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 2.0, "unit_price": 50.0 }]),
                10.0,
            ))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let invoice_id = body["invoice"]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/invoices/{invoice_id}/share-message"))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("from Acme Corp"));
    assert!(message.contains("Amount: $110.00"));
    assert!(message.contains("Due Date: 2024-02-15"));
    assert!(body["compose_url"]
        .as_str()
        .unwrap()
        .starts_with("https://wa.me/?text="));
}

#[actix_web::test]
async fn dashboard_aggregates_paid_revenue() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    for price in [100.0, 250.0] {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/invoices")
                .insert_header(bearer(ALICE))
                .set_json(invoice_request(
                    &company.id,
                    &customer.id,
                    json!([{ "description": "Consulting", "quantity": 1.0, "unit_price": price }]),
                    0.0,
                ))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 201);
    }

    // pay the second one in full
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/invoices?company_id={}", company.id))
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    let invoices: Value = test::read_body_json(resp).await;
    let target = invoices
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["total"] == json!(250.0))
        .unwrap();
    let target_id = target["id"].as_str().unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/invoices/{target_id}/payments"))
            .insert_header(bearer(ALICE))
            .set_json(json!({
                "amount": 250.0,
                "payment_date": "2024-03-01",
                "payment_method": "credit_card"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/dashboard")
            .insert_header(bearer(ALICE))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total_customers"], json!(1));
    assert_eq!(body["total_invoices"], json!(2));
    assert_eq!(body["paid_invoices"], json!(1));
    assert_eq!(body["total_revenue"], json!(250.0));
}

#[actix_web::test]
async fn users_cannot_reach_each_others_invoices() {
    let state = test_state().await;
    let company = seed_company(&state, "alice", None).await;
    let customer = seed_customer(&state, &company.id).await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/invoices")
            .insert_header(bearer(ALICE))
            .set_json(invoice_request(
                &company.id,
                &customer.id,
                json!([{ "description": "Consulting", "quantity": 1.0, "unit_price": 100.0 }]),
                0.0,
            ))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let invoice_id = body["invoice"]["id"].as_str().unwrap().to_string();

    for (method, uri) in [
        ("GET", format!("/api/v1/invoices/{invoice_id}")),
        ("DELETE", format!("/api/v1/invoices/{invoice_id}")),
        ("POST", format!("/api/v1/invoices/{invoice_id}/share")),
        ("GET", format!("/api/v1/invoices/{invoice_id}/pdf")),
    ] {
        let request = match method {
            "GET" => test::TestRequest::get(),
            "POST" => test::TestRequest::post(),
            _ => test::TestRequest::delete(),
        };
        let resp = test::call_service(
            &app,
            request.uri(&uri).insert_header(bearer(BOB)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), 404, "{method} {uri} should 404 for bob");
    }
}
