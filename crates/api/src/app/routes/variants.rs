use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use vitrine_core::{ProductId, VariantId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

/// Routes nested under `/produits`.
pub fn product_router() -> Router {
    Router::new().route("/:id/variantes", get(list_variants).post(create_variant))
}

/// Routes nested under `/variantes`.
pub fn router() -> Router {
    Router::new().route(
        "/:id",
        get(get_variant).put(update_variant).delete(delete_variant),
    )
}

fn parse_product_id(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("product"))
}

fn parse_variant_id(id: &str) -> Result<VariantId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("variant"))
}

pub async fn create_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(product_id): Path<String>,
    body: Result<Json<dto::CreateVariantRequest>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&product_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services
        .variants
        .create_variant(tenant.tenant_id(), product_id, body.into())
        .await
    {
        Ok(view) => (StatusCode::CREATED, Json(dto::variant_to_json(&view))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_variants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&product_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.variants.list_variants(tenant.tenant_id(), product_id).await {
        Ok(views) => {
            let items: Vec<_> = views.iter().map(dto::variant_to_json).collect();
            (StatusCode::OK, Json(json!({ "variantes": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_variant_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.variants.get_variant(tenant.tenant_id(), id).await {
        Ok(view) => (StatusCode::OK, Json(dto::variant_to_json(&view))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateVariantRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_variant_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services
        .variants
        .update_variant(tenant.tenant_id(), id, body.into())
        .await
    {
        Ok(view) => (StatusCode::OK, Json(dto::variant_to_json(&view))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_variant_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.variants.delete_variant(tenant.tenant_id(), id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
