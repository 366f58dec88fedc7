use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::{ApiError, ApiResult};
use super::middleware::auth::auth_info;
use super::state::ApiState;
use crate::models::{
    balance_due, calculate_totals, generate_invoice_number, settles, total_paid, Company, Customer,
    Invoice, InvoiceItem, InvoiceStatus, NewCompany, NewCustomer, NewInvoice, NewPayment,
    PaymentRecord,
};
use crate::storage::{from_row, insert_as, Filter, Row};

#[derive(Debug, Deserialize)]
pub struct CompanyScope {
    pub company_id: Option<String>,
}

// Ownership helpers: every read walks the user -> company -> invoice chain,
// so a caller can never reach another user's rows.

pub(crate) async fn owned_company(
    state: &ApiState,
    user_id: &str,
    company_id: &str,
) -> ApiResult<Company> {
    let rows = state
        .store
        .select(
            "companies",
            &[
                Filter::eq("id", company_id),
                Filter::eq("user_id", user_id),
            ],
        )
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("company not found"))?;
    Ok(from_row(row)?)
}

pub(crate) async fn owned_invoice(
    state: &ApiState,
    user_id: &str,
    invoice_id: &str,
) -> ApiResult<(Invoice, Company)> {
    let rows = state
        .store
        .select("invoices", &[Filter::eq("id", invoice_id)])
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("invoice not found"))?;
    let invoice: Invoice = from_row(row)?;
    let company = owned_company(state, user_id, &invoice.company_id)
        .await
        .map_err(|_| ApiError::not_found("invoice not found"))?;
    Ok((invoice, company))
}

pub(crate) async fn load_customer(
    state: &ApiState,
    company_id: &str,
    customer_id: &str,
) -> ApiResult<Customer> {
    let rows = state
        .store
        .select(
            "customers",
            &[
                Filter::eq("id", customer_id),
                Filter::eq("company_id", company_id),
            ],
        )
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("customer not found"))?;
    Ok(from_row(row)?)
}

pub(crate) async fn load_items(state: &ApiState, invoice_id: &str) -> ApiResult<Vec<InvoiceItem>> {
    let rows = state
        .store
        .select("invoice_items", &[Filter::eq("invoice_id", invoice_id)])
        .await?;
    rows.into_iter()
        .map(|row| Ok(from_row(row)?))
        .collect()
}

pub(crate) async fn load_payments(
    state: &ApiState,
    invoice_id: &str,
) -> ApiResult<Vec<PaymentRecord>> {
    let rows = state
        .store
        .select("invoice_payments", &[Filter::eq("invoice_id", invoice_id)])
        .await?;
    rows.into_iter()
        .map(|row| Ok(from_row(row)?))
        .collect()
}

pub(crate) fn check_rate_limit(state: &ApiState, key: &str) -> Option<HttpResponse> {
    if state.rate_limiter.check_key(&key.to_string()).is_err() {
        return Some(HttpResponse::TooManyRequests().json(json!({
            "error": "Rate limit exceeded",
            "retry_after": 60
        })));
    }
    None
}

fn patch(value: Value) -> ApiResult<Row> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::internal_server_error("patch must be an object")),
    }
}

// Companies

pub async fn list_companies(req: HttpRequest, state: web::Data<ApiState>) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let rows = state
        .store
        .select("companies", &[Filter::eq("user_id", info.user_id)])
        .await?;
    let companies: Vec<Company> = rows
        .into_iter()
        .map(|row| Ok::<_, ApiError>(from_row(row)?))
        .collect::<Result<_, _>>()?;
    Ok(HttpResponse::Ok().json(companies))
}

pub async fn create_company(
    req: HttpRequest,
    data: web::Json<NewCompany>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let data = data.into_inner();
    data.validate()?;
    let company = insert_as(
        state.store.as_ref(),
        "companies",
        &data.into_company(&info.user_id),
    )
    .await?;
    Ok(HttpResponse::Created().json(company))
}

pub async fn get_company(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let company = owned_company(&state, &info.user_id, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(company))
}

pub async fn update_company(
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<NewCompany>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let company_id = path.into_inner();
    owned_company(&state, &info.user_id, &company_id).await?;
    let data = data.into_inner();
    data.validate()?;

    let values = patch(serde_json::to_value(&data)?)?;
    state
        .store
        .update(
            "companies",
            values,
            &[
                Filter::eq("id", company_id.clone()),
                Filter::eq("user_id", info.user_id.clone()),
            ],
        )
        .await?;
    let company = owned_company(&state, &info.user_id, &company_id).await?;
    Ok(HttpResponse::Ok().json(company))
}

pub async fn delete_company(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let company_id = path.into_inner();
    owned_company(&state, &info.user_id, &company_id).await?;
    state
        .store
        .delete(
            "companies",
            &[
                Filter::eq("id", company_id),
                Filter::eq("user_id", info.user_id),
            ],
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "deleted" })))
}

// Customers

pub async fn list_customers(
    req: HttpRequest,
    query: web::Query<CompanyScope>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let company_id = query
        .into_inner()
        .company_id
        .ok_or_else(|| ApiError::bad_request("company_id query parameter is required"))?;
    owned_company(&state, &info.user_id, &company_id).await?;

    let rows = state
        .store
        .select("customers", &[Filter::eq("company_id", company_id)])
        .await?;
    let customers: Vec<Customer> = rows
        .into_iter()
        .map(|row| Ok::<_, ApiError>(from_row(row)?))
        .collect::<Result<_, _>>()?;
    Ok(HttpResponse::Ok().json(customers))
}

pub async fn create_customer(
    req: HttpRequest,
    data: web::Json<NewCustomer>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let data = data.into_inner();
    data.validate()?;
    owned_company(&state, &info.user_id, &data.company_id).await?;
    let customer = insert_as(state.store.as_ref(), "customers", &data.into_customer()).await?;
    Ok(HttpResponse::Created().json(customer))
}

async fn owned_customer(
    state: &ApiState,
    user_id: &str,
    customer_id: &str,
) -> ApiResult<Customer> {
    let rows = state
        .store
        .select("customers", &[Filter::eq("id", customer_id)])
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("customer not found"))?;
    let customer: Customer = from_row(row)?;
    owned_company(state, user_id, &customer.company_id)
        .await
        .map_err(|_| ApiError::not_found("customer not found"))?;
    Ok(customer)
}

pub async fn get_customer(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let customer = owned_customer(&state, &info.user_id, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(customer))
}

pub async fn update_customer(
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<NewCustomer>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let customer_id = path.into_inner();
    owned_customer(&state, &info.user_id, &customer_id).await?;
    let data = data.into_inner();
    data.validate()?;
    // the target company must be owned too, or a customer could be moved
    // into someone else's company
    owned_company(&state, &info.user_id, &data.company_id).await?;

    let values = patch(serde_json::to_value(&data)?)?;
    state
        .store
        .update("customers", values, &[Filter::eq("id", customer_id.clone())])
        .await?;
    let customer = owned_customer(&state, &info.user_id, &customer_id).await?;
    Ok(HttpResponse::Ok().json(customer))
}

pub async fn delete_customer(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let customer_id = path.into_inner();
    owned_customer(&state, &info.user_id, &customer_id).await?;
    state
        .store
        .delete("customers", &[Filter::eq("id", customer_id)])
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "deleted" })))
}

// Invoices

pub async fn list_invoices(
    req: HttpRequest,
    query: web::Query<CompanyScope>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let company_id = query
        .into_inner()
        .company_id
        .ok_or_else(|| ApiError::bad_request("company_id query parameter is required"))?;
    owned_company(&state, &info.user_id, &company_id).await?;

    let rows = state
        .store
        .select("invoices", &[Filter::eq("company_id", company_id)])
        .await?;
    let mut invoices: Vec<Invoice> = rows
        .into_iter()
        .map(|row| Ok::<_, ApiError>(from_row(row)?))
        .collect::<Result<_, _>>()?;
    invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(HttpResponse::Ok().json(invoices))
}

pub async fn create_invoice(
    req: HttpRequest,
    data: web::Json<NewInvoice>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let data = data.into_inner();

    // rejected before anything is persisted
    data.validate()?;
    owned_company(&state, &info.user_id, &data.company_id).await?;
    load_customer(&state, &data.company_id, &data.customer_id).await?;

    let tax_rate = data.tax_rate.unwrap_or(0.0);
    let totals = calculate_totals(&data.items, tax_rate);
    let invoice = Invoice {
        id: String::new(),
        company_id: data.company_id.clone(),
        customer_id: data.customer_id.clone(),
        invoice_number: data
            .invoice_number
            .clone()
            .unwrap_or_else(generate_invoice_number),
        date: data.date,
        due_date: data.due_date,
        currency: data.currency.clone().unwrap_or_else(|| "USD".to_string()),
        tax_type: data.tax_type.clone().unwrap_or_else(|| "VAT".to_string()),
        tax_rate,
        subtotal: totals.subtotal,
        tax_amount: totals.tax_amount,
        total: totals.total,
        status: InvoiceStatus::Unpaid,
        notes: data.notes.clone(),
        payment_method: None,
        payment_remarks: None,
        created_at: chrono::Utc::now(),
    };
    let invoice = insert_as(state.store.as_ref(), "invoices", &invoice).await?;

    let mut items = Vec::with_capacity(data.items.len());
    for item in &data.items {
        let stored = insert_as(
            state.store.as_ref(),
            "invoice_items",
            &InvoiceItem {
                id: String::new(),
                invoice_id: invoice.id.clone(),
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                amount: item.quantity * item.unit_price,
            },
        )
        .await?;
        items.push(stored);
    }

    Ok(HttpResponse::Created().json(json!({ "invoice": invoice, "items": items })))
}

pub async fn get_invoice(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let (invoice, company) = owned_invoice(&state, &info.user_id, &path.into_inner()).await?;
    let customer = load_customer(&state, &invoice.company_id, &invoice.customer_id).await?;
    let items = load_items(&state, &invoice.id).await?;
    let payments = load_payments(&state, &invoice.id).await?;
    let paid = total_paid(&payments);

    Ok(HttpResponse::Ok().json(json!({
        "invoice": invoice,
        "items": items,
        "company": company,
        "customer": customer,
        "payments": payments,
        "total_paid": paid,
        "balance_due": balance_due(invoice.total, paid),
    })))
}

pub async fn delete_invoice(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let (invoice, _) = owned_invoice(&state, &info.user_id, &path.into_inner()).await?;

    // children first; zero attached rows is fine
    for table in ["invoice_items", "invoice_payments", "invoice_shares"] {
        state
            .store
            .delete(table, &[Filter::eq("invoice_id", invoice.id.clone())])
            .await?;
    }
    state
        .store
        .delete("invoices", &[Filter::eq("id", invoice.id)])
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "deleted" })))
}

// Status & payments

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: InvoiceStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_remarks: Option<String>,
}

pub async fn set_invoice_status(
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<StatusChange>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let (invoice, _) = owned_invoice(&state, &info.user_id, &path.into_inner()).await?;
    let change = data.into_inner();

    // Only unpaid<->paid carry side effects; other statuses are stored as-is.
    let values = match change.status {
        InvoiceStatus::Paid => patch(json!({
            "status": change.status,
            "payment_method": change.payment_method,
            "payment_remarks": change.payment_remarks,
        }))?,
        InvoiceStatus::Unpaid => patch(json!({
            "status": change.status,
            "payment_method": null,
            "payment_remarks": null,
        }))?,
        _ => patch(json!({ "status": change.status }))?,
    };
    state
        .store
        .update("invoices", values, &[Filter::eq("id", invoice.id.clone())])
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "id": invoice.id, "status": change.status })))
}

pub async fn list_payments(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let (invoice, _) = owned_invoice(&state, &info.user_id, &path.into_inner()).await?;
    let payments = load_payments(&state, &invoice.id).await?;
    let paid = total_paid(&payments);
    Ok(HttpResponse::Ok().json(json!({
        "payments": payments,
        "total_paid": paid,
        "balance_due": balance_due(invoice.total, paid),
    })))
}

pub async fn add_payment(
    req: HttpRequest,
    path: web::Path<String>,
    data: web::Json<NewPayment>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let (invoice, _) = owned_invoice(&state, &info.user_id, &path.into_inner()).await?;
    let data = data.into_inner();
    data.validate()?;

    let payment = insert_as(
        state.store.as_ref(),
        "invoice_payments",
        &PaymentRecord {
            id: String::new(),
            invoice_id: invoice.id.clone(),
            amount: data.amount,
            payment_date: data.payment_date,
            payment_method: data.payment_method,
            payment_remarks: data.payment_remarks,
        },
    )
    .await?;

    // ledger completion: flip to paid once cumulative payments reach the total
    let payments = load_payments(&state, &invoice.id).await?;
    let paid = total_paid(&payments);
    let mut status = invoice.status;
    if status != InvoiceStatus::Paid && settles(paid, invoice.total) {
        state
            .store
            .update(
                "invoices",
                patch(json!({ "status": InvoiceStatus::Paid }))?,
                &[Filter::eq("id", invoice.id.clone())],
            )
            .await?;
        status = InvoiceStatus::Paid;
    }

    Ok(HttpResponse::Created().json(json!({
        "payment": payment,
        "invoice_status": status,
        "total_paid": paid,
        "balance_due": balance_due(invoice.total, paid),
    })))
}

// Dashboard

pub async fn dashboard(req: HttpRequest, state: web::Data<ApiState>) -> ApiResult<HttpResponse> {
    let info = auth_info(&req)?;
    let companies = state
        .store
        .select("companies", &[Filter::eq("user_id", info.user_id)])
        .await?;

    let mut total_customers = 0usize;
    let mut total_invoices = 0usize;
    let mut paid_invoices = 0usize;
    let mut total_revenue = 0.0f64;

    for company in &companies {
        let company_id = company.get("id").and_then(Value::as_str).unwrap_or_default();
        total_customers += state
            .store
            .select("customers", &[Filter::eq("company_id", company_id)])
            .await?
            .len();
        for row in state
            .store
            .select("invoices", &[Filter::eq("company_id", company_id)])
            .await?
        {
            let invoice: Invoice = from_row(row)?;
            total_invoices += 1;
            if invoice.status == InvoiceStatus::Paid {
                paid_invoices += 1;
                total_revenue += invoice.total;
            }
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "total_customers": total_customers,
        "total_invoices": total_invoices,
        "paid_invoices": paid_invoices,
        "total_revenue": total_revenue,
    })))
}
