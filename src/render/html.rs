use std::collections::HashMap;

use minijinja::{Environment, Value};
use once_cell::sync::Lazy;

use super::layout::{format_amount, format_percent};
use crate::core::{HippoError, HippoResult};
use crate::models::InvoiceDocument;

static ENV: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.add_filter("money", money_filter);
    env.add_filter("pct", pct_filter);
    // the .html name keeps auto-escaping on for every interpolated field
    env.add_template("invoice.html", include_str!("invoice.html"))
        .expect("embedded invoice template must compile");
    env
});

fn money_filter(value: Value) -> Result<Value, minijinja::Error> {
    let amount = f64::try_from(value).map_err(|_| {
        minijinja::Error::new(
            minijinja::ErrorKind::InvalidOperation,
            "value must be a number",
        )
    })?;
    Ok(Value::from(format_amount(amount)))
}

fn pct_filter(value: Value) -> Result<Value, minijinja::Error> {
    let rate = f64::try_from(value).map_err(|_| {
        minijinja::Error::new(
            minijinja::ErrorKind::InvalidOperation,
            "value must be a number",
        )
    })?;
    Ok(Value::from(format_percent(rate)))
}

/// Server-rendered preview of the invoice document. Used by the in-app
/// preview and the public share page.
pub fn render_preview(
    document: &InvoiceDocument,
    logo_data_url: Option<&str>,
) -> HippoResult<String> {
    let template = ENV
        .get_template("invoice.html")
        .map_err(|e| HippoError::render(e.to_string()))?;

    let mut context = HashMap::new();
    context.insert(
        "doc",
        serde_json::to_value(document).map_err(|e| HippoError::render(e.to_string()))?,
    );
    context.insert(
        "logo_data_url",
        serde_json::to_value(logo_data_url).map_err(|e| HippoError::render(e.to_string()))?,
    );
    context.insert(
        "initial",
        serde_json::Value::String(document.company_initial().to_string()),
    );

    template
        .render(&context)
        .map_err(|e| HippoError::render(e.to_string()))
}

/// Full-page error result for the public share route.
pub fn render_error_page(title: &str, detail: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title>
<style>
  body {{ font-family: Helvetica, Arial, sans-serif; background: #f3f4f6; color: #1f2937;
         display: flex; align-items: center; justify-content: center; height: 100vh; margin: 0; }}
  .panel {{ background: #fff; padding: 40px 56px; box-shadow: 0 1px 4px rgba(0,0,0,.12);
            border-radius: 8px; text-align: center; }}
  p {{ color: #6b7280; }}
</style></head>
<body><div class="panel"><h1>{title}</h1><p>{detail}</p></div></body>
</html>
"#
    )
}
