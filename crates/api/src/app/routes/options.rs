use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde_json::json;

use vitrine_core::{OptionId, OptionValueId, ProductId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

/// Routes nested under `/produits`.
pub fn product_router() -> Router {
    Router::new().route("/:id/options", get(list_options).post(create_option))
}

/// Routes nested under `/options`.
pub fn router() -> Router {
    Router::new()
        .route(
            "/:id",
            get(get_option).put(update_option).delete(delete_option),
        )
        .route("/:id/valeurs", get(list_values).post(create_value))
}

/// Routes nested under `/valeurs`.
pub fn value_router() -> Router {
    Router::new().route("/:id", put(update_value).delete(delete_value))
}

fn parse_product_id(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("product"))
}

fn parse_option_id(id: &str) -> Result<OptionId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("option"))
}

fn parse_value_id(id: &str) -> Result<OptionValueId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("option value"))
}

pub async fn create_option(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(product_id): Path<String>,
    body: Result<Json<dto::CreateOptionRequest>, JsonRejection>,
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
        .options
        .create_option(tenant.tenant_id(), product_id, body.into())
        .await
    {
        Ok(option) => (
            StatusCode::CREATED,
            Json(dto::option_to_json(&option, &[])),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_options(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&product_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.options.list_options(tenant.tenant_id(), product_id).await {
        Ok(options) => {
            let items: Vec<_> = options.iter().map(dto::option_with_values_to_json).collect();
            (StatusCode::OK, Json(json!({ "options": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_option(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_option_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.options.get_option(tenant.tenant_id(), id).await {
        Ok(option) => (StatusCode::OK, Json(dto::option_with_values_to_json(&option))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_option(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateOptionRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_option_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let tenant_id = tenant.tenant_id();
    let option = match services.options.update_option(tenant_id, id, body.into()).await {
        Ok(option) => option,
        Err(e) => return errors::service_error_to_response(e),
    };

    match services.options.list_values(tenant_id, option.id).await {
        Ok(values) => (StatusCode::OK, Json(dto::option_to_json(&option, &values))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_option(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_option_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.options.delete_option(tenant.tenant_id(), id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_value(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(option_id): Path<String>,
    body: Result<Json<dto::CreateOptionValueRequest>, JsonRejection>,
) -> axum::response::Response {
    let option_id = match parse_option_id(&option_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services
        .options
        .create_value(tenant.tenant_id(), option_id, body.into())
        .await
    {
        Ok(value) => (StatusCode::CREATED, Json(dto::value_to_json(&value))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_values(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(option_id): Path<String>,
) -> axum::response::Response {
    let option_id = match parse_option_id(&option_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.options.list_values(tenant.tenant_id(), option_id).await {
        Ok(values) => {
            let items: Vec<_> = values.iter().map(dto::value_to_json).collect();
            (StatusCode::OK, Json(json!({ "valeurs": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_value(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateOptionValueRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_value_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.options.update_value(tenant.tenant_id(), id, body.into()).await {
        Ok(value) => (StatusCode::OK, Json(dto::value_to_json(&value))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_value(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_value_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.options.delete_value(tenant.tenant_id(), id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
