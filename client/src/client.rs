//! `reqwest` implementation of [`InventoryApi`].

use crate::config::ClientConfig;
use crate::error::ClientError;
use inventory_sync_store::environment::{ApiFuture, InventoryApi};
use inventory_sync_store::types::{
    MaterialsReplacement, NewProduct, NewRawMaterial, Product, ProductId, ProductMaterial,
    ProductPatch, ProductionSuggestion, RawMaterial, RawMaterialId,
};
use inventory_sync_store::TransportFailure;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// HTTP transport to the inventory server
///
/// Reports raw failures only: a non-2xx response becomes
/// [`TransportFailure::Http`] with its status, content type and body;
/// anything that prevents reading a response (connection, timeout, a
/// success body that does not decode) becomes [`TransportFailure::Network`].
#[derive(Clone, Debug)]
pub struct HttpInventoryApi {
    client: Client,
    base_url: Url,
}

impl HttpInventoryApi {
    /// Build a client from `config`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the config is invalid or the TLS backend
    /// cannot be initialised.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBaseUrl(config.base_url.clone()))?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, base_url })
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL with `segments` appended, each one percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Base URLs that cannot take a path are rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send and return the response if its status is 2xx
    async fn send(request: RequestBuilder) -> Result<Response, TransportFailure> {
        let response = request.send().await.map_err(|error| {
            tracing::debug!(%error, "Request did not produce a response");
            TransportFailure::network(error.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), ?content_type, "Server rejected request");

        Err(TransportFailure::Http {
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    /// Send and decode a JSON body
    async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, TransportFailure> {
        let response = Self::send(request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|error| TransportFailure::network(error.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|error| {
            TransportFailure::network(format!("Undecodable response body: {error}"))
        })
    }

    /// Send and ignore the body (commonly `204 No Content`)
    async fn execute(request: RequestBuilder) -> Result<(), TransportFailure> {
        Self::send(request).await.map(drop)
    }

    /// `GET /health/whoami`, falling back to the plain-text
    /// `GET /production/whoami`
    ///
    /// The fallback's own failure is not reported; the caller sees the
    /// failure of the primary endpoint.
    async fn whoami(&self) -> Result<String, TransportFailure> {
        let primary = self.client.get(self.endpoint(&["health", "whoami"]));
        let failure = match Self::fetch::<Value>(primary).await {
            Ok(body) => return Ok(host_name(body)),
            Err(failure) => failure,
        };

        tracing::debug!(%failure, "Whoami failed, trying the production endpoint");
        let fallback = self.client.get(self.endpoint(&["production", "whoami"]));
        match Self::send(fallback).await {
            Ok(response) => response
                .text()
                .await
                .map_err(|error| TransportFailure::network(error.to_string())),
            Err(_) => Err(failure),
        }
    }
}

/// Host name from a whoami body: `{"pod": ...}` or a bare string
fn host_name(body: Value) -> String {
    match body {
        Value::String(name) => name,
        Value::Object(mut fields) => fields.remove("pod").map(host_name).unwrap_or_default(),
        other => other.to_string(),
    }
}

impl InventoryApi for HttpInventoryApi {
    fn fetch_raw_materials(&self) -> ApiFuture<'_, Vec<RawMaterial>> {
        Box::pin(Self::fetch(self.client.get(self.endpoint(&["raw-materials"]))))
    }

    fn create_raw_material(&self, input: NewRawMaterial) -> ApiFuture<'_, RawMaterial> {
        Box::pin(Self::fetch(
            self.client.post(self.endpoint(&["raw-materials"])).json(&input),
        ))
    }

    fn update_raw_material(&self, material: RawMaterial) -> ApiFuture<'_, RawMaterial> {
        let body = NewRawMaterial {
            name: material.name,
            stock_quantity: material.stock_quantity,
        };
        Box::pin(Self::fetch(
            self.client
                .put(self.endpoint(&["raw-materials", material.id.as_str()]))
                .json(&body),
        ))
    }

    fn delete_raw_material(&self, id: RawMaterialId) -> ApiFuture<'_, ()> {
        Box::pin(Self::execute(
            self.client.delete(self.endpoint(&["raw-materials", id.as_str()])),
        ))
    }

    fn fetch_products(&self) -> ApiFuture<'_, Vec<Product>> {
        Box::pin(Self::fetch(self.client.get(self.endpoint(&["products"]))))
    }

    fn create_product(&self, input: NewProduct) -> ApiFuture<'_, Product> {
        Box::pin(Self::fetch(self.client.post(self.endpoint(&["products"])).json(&input)))
    }

    fn update_product(&self, id: ProductId, patch: ProductPatch) -> ApiFuture<'_, Product> {
        Box::pin(Self::fetch(
            self.client
                .put(self.endpoint(&["products", id.as_str()]))
                .json(&patch),
        ))
    }

    fn delete_product(&self, id: ProductId) -> ApiFuture<'_, ()> {
        Box::pin(Self::execute(
            self.client.delete(self.endpoint(&["products", id.as_str()])),
        ))
    }

    fn replace_product_materials(
        &self,
        product_id: ProductId,
        replacement: MaterialsReplacement,
    ) -> ApiFuture<'_, Vec<ProductMaterial>> {
        Box::pin(Self::fetch(
            self.client
                .put(self.endpoint(&["product-materials", product_id.as_str()]))
                .json(&replacement),
        ))
    }

    fn delete_product_material(
        &self,
        product_id: ProductId,
        material_id: RawMaterialId,
    ) -> ApiFuture<'_, ()> {
        Box::pin(Self::execute(self.client.delete(self.endpoint(&[
            "product-materials",
            product_id.as_str(),
            material_id.as_str(),
        ]))))
    }

    fn fetch_production_suggestions(&self) -> ApiFuture<'_, Vec<ProductionSuggestion>> {
        Box::pin(Self::fetch(self.client.get(self.endpoint(&["production", "suggestions"]))))
    }

    fn fetch_whoami(&self) -> ApiFuture<'_, String> {
        Box::pin(self.whoami())
    }

    /// Any 2xx answer is healthy; other statuses and network failures are not
    fn check_health(&self) -> ApiFuture<'_, bool> {
        Box::pin(async move {
            match self.client.get(self.endpoint(&["health"])).send().await {
                Ok(response) => Ok(response.status().is_success()),
                Err(error) => {
                    tracing::debug!(%error, "Health check failed");
                    Ok(false)
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api(base_url: &str) -> Result<HttpInventoryApi, String> {
        ClientConfig::new(base_url)
            .map_err(|error| error.to_string())
            .and_then(|config| HttpInventoryApi::new(&config).map_err(|error| error.to_string()))
    }

    #[test]
    fn urls_join_base_and_path() {
        assert_eq!(
            api("http://localhost:8081/").map(|api| api.endpoint(&["products"]).to_string()),
            Ok("http://localhost:8081/products".to_string())
        );
        assert_eq!(
            api("http://localhost:8081/api")
                .map(|api| api.endpoint(&["production", "suggestions"]).to_string()),
            Ok("http://localhost:8081/api/production/suggestions".to_string())
        );
    }

    #[test]
    fn ids_are_encoded_as_single_segments() {
        assert_eq!(
            api("http://localhost:8081")
                .map(|api| api.endpoint(&["product-materials", "7/../9", "a?b#c"]).to_string()),
            Ok("http://localhost:8081/product-materials/7%2F..%2F9/a%3Fb%23c".to_string())
        );
    }

    #[test]
    fn host_name_accepts_object_or_string() {
        assert_eq!(host_name(json!({"pod": "inventory-7f9c"})), "inventory-7f9c");
        assert_eq!(host_name(json!("athens-vps")), "athens-vps");
        assert_eq!(host_name(json!({"status": "UP"})), "");
    }
}
