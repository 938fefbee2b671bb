use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use vitrine_api::app::{AppServices, build_app};
use vitrine_core::TenantId;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let app = build_app(Arc::new(AppServices::in_memory()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Boutique {
    client: reqwest::Client,
    tenant: String,
}

impl Boutique {
    fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            tenant: TenantId::new().to_string(),
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> (StatusCode, Value) {
        let res = req.header("X-Boutique-ID", &self.tenant).send().await.unwrap();
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, url: String) -> (StatusCode, Value) {
        self.send(self.client.get(url)).await
    }

    async fn post(&self, url: String, body: Value) -> (StatusCode, Value) {
        self.send(self.client.post(url).json(&body)).await
    }

    async fn put(&self, url: String, body: Value) -> (StatusCode, Value) {
        self.send(self.client.put(url).json(&body)).await
    }

    async fn delete(&self, url: String) -> (StatusCode, Value) {
        self.send(self.client.delete(url)).await
    }
}

fn id_of(body: &Value) -> String {
    body["id"].as_str().expect("response has an id").to_string()
}

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::spawn().await;

    let res = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn catalog_routes_require_tenant_header() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/produits")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("missing_tenant"));

    let res = client
        .get(server.url("/produits"))
        .header("X-Boutique-ID", "not-a-uuid")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chaise_catalog_end_to_end() {
    let server = TestServer::spawn().await;
    let shop = Boutique::new();

    let (status, product) = shop
        .post(
            server.url("/produits"),
            json!({ "titre": "Chaise", "prix_defaut": 50, "devise": "EUR" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["slug"], json!("chaise"));
    assert_eq!(product["statut"], json!("brouillon"));
    let product_id = id_of(&product);

    let (status, option) = shop
        .post(
            server.url(&format!("/produits/{product_id}/options")),
            json!({ "nom": "Couleur" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(option["position"], json!(1));
    let option_id = id_of(&option);

    let (status, rouge) = shop
        .post(
            server.url(&format!("/options/{option_id}/valeurs")),
            json!({ "valeur": "Rouge" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rouge["position"], json!(1));
    let (_, bleu) = shop
        .post(
            server.url(&format!("/options/{option_id}/valeurs")),
            json!({ "valeur": "Bleu" }),
        )
        .await;
    assert_eq!(bleu["position"], json!(2));

    let (status, variant) = shop
        .post(
            server.url(&format!("/produits/{product_id}/variantes")),
            json!({ "sku": "CH-R", "valeur_option_ids": [id_of(&rouge)] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(variant["prix"], Value::Null);
    assert_eq!(variant["prix_effectif"].as_f64(), Some(50.0));
    assert_eq!(variant["valeurs_options"][0]["valeur"], json!("Rouge"));

    let (status, body) = shop
        .post(
            server.url(&format!("/produits/{product_id}/variantes")),
            json!({ "sku": "CH-R2", "valeur_option_ids": [id_of(&rouge)] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("conflict"));

    let (status, listed) = shop
        .get(server.url(&format!("/produits/{product_id}/variantes")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["variantes"].as_array().map(Vec::len), Some(1));

    let (status, updated) = shop
        .put(
            server.url(&format!("/variantes/{}", id_of(&variant))),
            json!({ "prix": 65 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["prix_effectif"].as_f64(), Some(65.0));
}

#[tokio::test]
async fn other_boutiques_cannot_see_products() {
    let server = TestServer::spawn().await;
    let owner = Boutique::new();
    let stranger = Boutique::new();

    let (_, product) = owner
        .post(
            server.url("/produits"),
            json!({ "titre": "Table basse", "prix_defaut": 120, "devise": "EUR" }),
        )
        .await;
    let product_id = id_of(&product);

    let (status, body) = stranger
        .get(server.url(&format!("/produits/{product_id}")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("not_found"));

    let (status, _) = stranger
        .post(
            server.url(&format!("/produits/{product_id}/options")),
            json!({ "nom": "Taille" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = stranger.get(server.url("/produits")).await;
    assert_eq!(listed["produits"], json!([]));
}

#[tokio::test]
async fn deleting_an_option_removes_its_values() {
    let server = TestServer::spawn().await;
    let shop = Boutique::new();

    let (_, product) = shop
        .post(
            server.url("/produits"),
            json!({ "titre": "Lampe", "prix_defaut": 30, "devise": "EUR" }),
        )
        .await;
    let (_, option) = shop
        .post(
            server.url(&format!("/produits/{}/options", id_of(&product))),
            json!({ "nom": "Finition" }),
        )
        .await;
    let option_id = id_of(&option);
    shop.post(
        server.url(&format!("/options/{option_id}/valeurs")),
        json!({ "valeur": "Laiton" }),
    )
    .await;

    let (status, body) = shop.delete(server.url(&format!("/options/{option_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));

    let (status, _) = shop
        .get(server.url(&format!("/options/{option_id}/valeurs")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_paginates_and_hides_deleted_products() {
    let server = TestServer::spawn().await;
    let shop = Boutique::new();

    let mut ids = Vec::new();
    for titre in ["Chaise Rouge", "Chaise Bleue", "Tabouret"] {
        let (_, product) = shop
            .post(
                server.url("/produits"),
                json!({ "titre": titre, "prix_defaut": 10, "devise": "EUR", "marque": "Atelier" }),
            )
            .await;
        ids.push(id_of(&product));
    }

    let (status, page) = shop
        .get(server.url("/produits/search?search=chaise&limit=1&page=2"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], json!(2));
    assert_eq!(page["limite"], json!(1));
    assert_eq!(page["produits"].as_array().map(Vec::len), Some(1));

    let (status, _) = shop.delete(server.url(&format!("/produits/{}", ids[2]))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, live) = shop.get(server.url("/produits/search?marque=Atelier")).await;
    assert_eq!(live["produits"].as_array().map(Vec::len), Some(2));

    let (_, all) = shop
        .get(server.url("/produits/search?marque=Atelier&inclure_supprime=true"))
        .await;
    assert_eq!(all["produits"].as_array().map(Vec::len), Some(3));

    let (status, _) = shop.get(server.url(&format!("/produits/{}", ids[2]))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
    let server = TestServer::spawn().await;
    let shop = Boutique::new();

    let res = shop
        .client
        .post(server.url("/produits"))
        .header("X-Boutique-ID", &shop.tenant)
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let (status, body) = shop
        .post(
            server.url("/produits"),
            json!({ "titre": "   ", "prix_defaut": 10, "devise": "EUR" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("validation_error"));

    let (status, body) = shop.get(server.url("/produits/not-an-id")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_id"));

    let (status, _) = shop.get(server.url("/produits/search?statut=vendu")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn variants_follow_option_and_value_deletions() {
    let server = TestServer::spawn().await;
    let shop = Boutique::new();

    let (_, product) = shop
        .post(
            server.url("/produits"),
            json!({ "titre": "Fauteuil", "prix_defaut": 200, "devise": "EUR" }),
        )
        .await;
    let product_id = id_of(&product);

    let (_, couleur) = shop
        .post(
            server.url(&format!("/produits/{product_id}/options")),
            json!({ "nom": "Couleur" }),
        )
        .await;
    let (_, taille) = shop
        .post(
            server.url(&format!("/produits/{product_id}/options")),
            json!({ "nom": "Taille" }),
        )
        .await;
    let mut values = Vec::new();
    for (option, valeur) in [(&couleur, "Rouge"), (&couleur, "Bleu"), (&taille, "S")] {
        let (_, value) = shop
            .post(
                server.url(&format!("/options/{}/valeurs", id_of(option))),
                json!({ "valeur": valeur }),
            )
            .await;
        values.push(id_of(&value));
    }
    let (rouge, bleu, small) = (&values[0], &values[1], &values[2]);

    let (_, red_small) = shop
        .post(
            server.url(&format!("/produits/{product_id}/variantes")),
            json!({ "sku": "FA-RS", "valeur_option_ids": [rouge, small] }),
        )
        .await;
    let (_, blue_small) = shop
        .post(
            server.url(&format!("/produits/{product_id}/variantes")),
            json!({ "sku": "FA-BS", "valeur_option_ids": [bleu, small] }),
        )
        .await;

    let (status, _) = shop.delete(server.url(&format!("/valeurs/{rouge}"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = shop
        .get(server.url(&format!("/variantes/{}", id_of(&red_small))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valeurs_options"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["valeurs_options"][0]["valeur"], json!("S"));

    let (status, _) = shop
        .delete(server.url(&format!("/options/{}", id_of(&couleur))))
        .await;
    assert_eq!(status, StatusCode::OK);

    for variant in [&red_small, &blue_small] {
        let (status, body) = shop
            .put(
                server.url(&format!("/variantes/{}", id_of(variant))),
                json!({ "quantite_stock": 3 }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantite_stock"], json!(3));
        assert_eq!(body["valeurs_options"][0]["valeur"], json!("S"));
    }

    let (status, _) = shop
        .post(
            server.url(&format!("/produits/{product_id}/variantes")),
            json!({ "sku": "FA-S", "valeur_option_ids": [small] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
