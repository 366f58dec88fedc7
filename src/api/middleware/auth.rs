use actix_web::{dev::ServiceRequest, web, Error, HttpMessage, HttpRequest};
use actix_web_httpauth::extractors::bearer::{BearerAuth, Config};
use actix_web_httpauth::extractors::AuthenticationError;

use crate::api::error::ApiError;
use crate::api::state::ApiState;

/// Identity placed into request extensions once the bearer token resolves.
#[derive(Clone, Debug)]
pub struct AuthInfo {
    pub user_id: String,
    pub email: String,
}

pub async fn validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let token = credentials.token().to_string();
    if token.is_empty() {
        return Err((AuthenticationError::from(Config::default()).into(), req));
    }

    let state = match req.app_data::<web::Data<ApiState>>() {
        Some(state) => state.clone(),
        None => return Err((AuthenticationError::from(Config::default()).into(), req)),
    };

    match state.sessions.resolve(&token).await {
        Ok(session) => {
            req.extensions_mut().insert(AuthInfo {
                user_id: session.user_id,
                email: session.email,
            });
            Ok(req)
        }
        Err(err) => {
            tracing::debug!("token rejected: {err}");
            Err((AuthenticationError::from(Config::default()).into(), req))
        }
    }
}

pub fn auth_info(req: &HttpRequest) -> Result<AuthInfo, ApiError> {
    req.extensions()
        .get::<AuthInfo>()
        .cloned()
        .ok_or_else(|| {
            ApiError::new(
                "missing auth context",
                actix_web::http::StatusCode::UNAUTHORIZED,
            )
        })
}
