use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const TOKEN_LEN: usize = 32;

/// Grants unauthenticated read access to one invoice's document. There is no
/// revocation beyond expiry; issuing again mints a fresh token and leaves old
/// ones valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceShare {
    pub id: String,
    pub invoice_id: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl InvoiceShare {
    /// Mints a share for the invoice. `expiry_days == 0` means the token
    /// never expires.
    pub fn issue(invoice_id: &str, expiry_days: i64) -> Self {
        let now = Utc::now();
        let expires_at = if expiry_days > 0 {
            Some(now + Duration::days(expiry_days))
        } else {
            None
        };
        InvoiceShare {
            id: String::new(),
            invoice_id: invoice_id.to_string(),
            token: mint_token(),
            created_at: now,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expiry| now > expiry)
    }
}

pub fn mint_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
