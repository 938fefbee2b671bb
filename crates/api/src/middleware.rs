use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use vitrine_core::TenantId;

use crate::app::errors;
use crate::context::TenantContext;

/// Header naming the boutique (tenant) a request acts for.
pub const TENANT_HEADER: &str = "x-boutique-id";

pub async fn tenant_middleware(mut req: Request, next: Next) -> Response {
    let tenant_id = match extract_tenant(req.headers()) {
        Ok(tenant_id) => tenant_id,
        Err(message) => {
            return errors::json_error(StatusCode::UNAUTHORIZED, "missing_tenant", message);
        }
    };

    req.extensions_mut().insert(TenantContext::new(tenant_id));
    next.run(req).await
}

fn extract_tenant(headers: &HeaderMap) -> Result<TenantId, &'static str> {
    let header = headers
        .get(TENANT_HEADER)
        .ok_or("X-Boutique-ID header is required")?;

    let header = header
        .to_str()
        .map_err(|_| "X-Boutique-ID header is not valid text")?
        .trim();
    if header.is_empty() {
        return Err("X-Boutique-ID header is required");
    }

    header
        .parse::<TenantId>()
        .map_err(|_| "X-Boutique-ID header must be a UUID")
}
