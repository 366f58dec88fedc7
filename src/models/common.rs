use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{HippoError, HippoResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub bank_account: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub bank_account: Option<String>,
}

impl NewCompany {
    pub fn validate(&self) -> HippoResult<()> {
        require("name", &self.name)?;
        require("address", &self.address)?;
        require("phone", &self.phone)?;
        require_email(&self.email)?;
        if let Some(url) = &self.logo_url {
            if !(url.starts_with("http://")
                || url.starts_with("https://")
                || url.starts_with("data:image/"))
            {
                return Err(HippoError::validation(
                    "logo_url must be an http(s) URL or a data:image URL",
                ));
            }
        }
        Ok(())
    }

    pub fn into_company(self, user_id: &str) -> Company {
        Company {
            id: String::new(),
            user_id: user_id.to_string(),
            name: self.name,
            address: self.address,
            phone: self.phone,
            email: self.email,
            logo_url: self.logo_url,
            bank_name: self.bank_name,
            bank_account: self.bank_account,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub company_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl NewCustomer {
    pub fn validate(&self) -> HippoResult<()> {
        require("company_id", &self.company_id)?;
        require("name", &self.name)?;
        require_email(&self.email)?;
        require("phone", &self.phone)?;
        require("address", &self.address)?;
        Ok(())
    }

    pub fn into_customer(self) -> Customer {
        Customer {
            id: String::new(),
            company_id: self.company_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            created_at: Utc::now(),
        }
    }
}

fn require(field: &str, value: &str) -> HippoResult<()> {
    if value.trim().is_empty() {
        Err(HippoError::validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

fn require_email(value: &str) -> HippoResult<()> {
    require("email", value)?;
    let valid = value.split_once('@').map_or(false, |(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    });
    if valid {
        Ok(())
    } else {
        Err(HippoError::validation("email is invalid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company_input() -> NewCompany {
        NewCompany {
            name: "Acme Corp".to_string(),
            address: "1 Main St".to_string(),
            phone: "+1 555 0100".to_string(),
            email: "billing@acme.test".to_string(),
            logo_url: None,
            bank_name: None,
            bank_account: None,
        }
    }

    #[test]
    fn accepts_complete_company() {
        assert!(company_input().validate().is_ok());
    }

    #[test]
    fn rejects_blank_required_fields() {
        let mut input = company_input();
        input.address = "   ".to_string();
        assert!(matches!(input.validate(), Err(HippoError::Validation(_))));
    }

    #[test]
    fn rejects_malformed_logo_url() {
        let mut input = company_input();
        input.logo_url = Some("ftp://example.test/logo.png".to_string());
        assert!(input.validate().is_err());

        input.logo_url = Some("data:image/png;base64,AAAA".to_string());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn rejects_invalid_email() {
        let mut input = company_input();
        input.email = "not-an-email".to_string();
        assert!(input.validate().is_err());
    }
}
