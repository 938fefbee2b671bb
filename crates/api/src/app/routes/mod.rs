use axum::Router;

pub mod options;
pub mod products;
pub mod system;
pub mod variants;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest(
            "/produits",
            products::router()
                .merge(options::product_router())
                .merge(variants::product_router()),
        )
        .nest("/options", options::router())
        .nest("/valeurs", options::value_router())
        .nest("/variantes", variants::router())
}
