//! Credential-aware HTTP client for the storefront channel.

use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::types::{
    ImagePayload, ProductPayload, ProductUpdatePayload, RemoteImage, RemoteOrder, RemoteProduct,
    RemoteVariant, RemoteWebhook, VariantPayload, WebhookPayload,
};
use super::ChannelError;
use crate::config::ChannelConfig;
use crate::db::IntegrationRepository;
use crate::db::integrations::ChannelIntegration;
use crate::tenant::TenantContext;

/// Client for the channel REST API.
///
/// One instance serves every tenant: each call resolves the current tenant
/// context and scopes the request by that tenant's store ID and token.
/// Credentials are cached per tenant+database with a short TTL so rotation
/// in the tenant database takes effect quickly; the cache is never shared
/// across tenants because the key carries both tag and database identity.
#[derive(Clone)]
pub struct ChannelClient {
    http: reqwest::Client,
    api_base: String,
    credentials: Cache<String, ChannelIntegration>,
}

impl ChannelClient {
    /// Create a new channel client.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Http` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let credentials = Cache::builder()
            .time_to_live(config.credential_ttl)
            .max_capacity(1024)
            .build();

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            credentials,
        })
    }

    /// Resolve the current tenant's credentials, consulting the cache first.
    async fn integration(&self) -> Result<ChannelIntegration, ChannelError> {
        let ctx = TenantContext::current()?;
        let key = ctx.cache_key();

        if let Some(cached) = self.credentials.get(&key).await {
            return Ok(cached);
        }

        let integration = IntegrationRepository::new(ctx.pool())
            .active()
            .await?
            .ok_or(ChannelError::NotConfigured)?;

        self.credentials.insert(key, integration.clone()).await;
        Ok(integration)
    }

    /// The current tenant's webhook secret (cached alongside the token).
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::NotConfigured` when the tenant has no active
    /// integration.
    pub async fn webhook_secret(&self) -> Result<SecretString, ChannelError> {
        Ok(self.integration().await?.webhook_secret)
    }

    fn url(&self, store_id: &str, path: &str) -> String {
        format!("{}/stores/{store_id}{path}", self.api_base)
    }

    /// Execute a request and decode the JSON body of a 2xx response.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        token: &SecretString,
    ) -> Result<T, ChannelError> {
        let response = request
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ChannelError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::from_response(status.as_u16(), &body));
        }

        Ok(response.json::<T>().await?)
    }

    /// Execute a request where the response body is irrelevant.
    async fn execute_empty(
        &self,
        request: reqwest::RequestBuilder,
        token: &SecretString,
    ) -> Result<(), ChannelError> {
        let response = request
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::from_response(status.as_u16(), &body));
        }

        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ChannelError> {
        let integration = self.integration().await?;
        let url = self.url(&integration.store_id, path);
        self.execute(self.http.get(&url), &integration.access_token)
            .await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ChannelError> {
        let integration = self.integration().await?;
        let url = self.url(&integration.store_id, path);
        self.execute(self.http.post(&url).json(body), &integration.access_token)
            .await
    }

    async fn put_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ChannelError> {
        let integration = self.integration().await?;
        let url = self.url(&integration.store_id, path);
        self.execute(self.http.put(&url).json(body), &integration.access_token)
            .await
    }

    async fn delete(&self, path: &str) -> Result<(), ChannelError> {
        let integration = self.integration().await?;
        let url = self.url(&integration.store_id, path);
        self.execute_empty(self.http.delete(&url), &integration.access_token)
            .await
    }

    // =========================================================================
    // Product methods
    // =========================================================================

    /// Fetch a remote product by ID.
    ///
    /// Returns `None` on 404 - the reconciler treats a vanished remote
    /// product as a signal to self-heal, not as a failure.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response other than 404.
    #[instrument(skip(self), fields(remote_product_id = %id))]
    pub async fn get_product(&self, id: &str) -> Result<Option<RemoteProduct>, ChannelError> {
        match self.get_json(&format!("/products/{id}")).await {
            Ok(product) => Ok(Some(product)),
            Err(ChannelError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create a remote product with its full payload (variants and images).
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::CategoryLimit` when the store's category cap
    /// rejects the payload; any other non-2xx response maps per
    /// [`ChannelError::from_response`].
    #[instrument(skip(self, payload), fields(name = %payload.name))]
    pub async fn create_product(
        &self,
        payload: &ProductPayload,
    ) -> Result<RemoteProduct, ChannelError> {
        self.post_json("/products", payload).await
    }

    /// Update a remote product (product-level fields only).
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response.
    #[instrument(skip(self, payload), fields(remote_product_id = %id))]
    pub async fn update_product(
        &self,
        id: &str,
        payload: &ProductUpdatePayload,
    ) -> Result<RemoteProduct, ChannelError> {
        self.put_json(&format!("/products/{id}"), payload).await
    }

    // =========================================================================
    // Variant methods
    // =========================================================================

    /// Create a variant under a remote product.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response.
    #[instrument(skip(self, payload), fields(remote_product_id = %product_id, sku = %payload.sku))]
    pub async fn create_variant(
        &self,
        product_id: &str,
        payload: &VariantPayload,
    ) -> Result<RemoteVariant, ChannelError> {
        self.post_json(&format!("/products/{product_id}/variants"), payload)
            .await
    }

    /// Update an existing variant.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response.
    #[instrument(skip(self, payload), fields(remote_product_id = %product_id, remote_variant_id = %variant_id))]
    pub async fn update_variant(
        &self,
        product_id: &str,
        variant_id: &str,
        payload: &VariantPayload,
    ) -> Result<RemoteVariant, ChannelError> {
        self.put_json(
            &format!("/products/{product_id}/variants/{variant_id}"),
            payload,
        )
        .await
    }

    /// Delete a variant.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response.
    #[instrument(skip(self), fields(remote_product_id = %product_id, remote_variant_id = %variant_id))]
    pub async fn delete_variant(
        &self,
        product_id: &str,
        variant_id: &str,
    ) -> Result<(), ChannelError> {
        self.delete(&format!("/products/{product_id}/variants/{variant_id}"))
            .await
    }

    // =========================================================================
    // Image methods
    // =========================================================================

    /// List a remote product's images.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response.
    #[instrument(skip(self), fields(remote_product_id = %product_id))]
    pub async fn list_images(&self, product_id: &str) -> Result<Vec<RemoteImage>, ChannelError> {
        self.get_json(&format!("/products/{product_id}/images"))
            .await
    }

    /// Attach an image to a remote product.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response.
    #[instrument(skip(self, payload), fields(remote_product_id = %product_id))]
    pub async fn create_image(
        &self,
        product_id: &str,
        payload: &ImagePayload,
    ) -> Result<RemoteImage, ChannelError> {
        self.post_json(&format!("/products/{product_id}/images"), payload)
            .await
    }

    // =========================================================================
    // Webhook methods
    // =========================================================================

    /// List the store's webhook subscriptions.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response.
    #[instrument(skip(self))]
    pub async fn list_webhooks(&self) -> Result<Vec<RemoteWebhook>, ChannelError> {
        self.get_json("/webhooks").await
    }

    /// Create a webhook subscription.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response.
    #[instrument(skip(self, payload), fields(event = %payload.event))]
    pub async fn create_webhook(
        &self,
        payload: &WebhookPayload,
    ) -> Result<RemoteWebhook, ChannelError> {
        self.post_json("/webhooks", payload).await
    }

    /// Delete a webhook subscription.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response.
    #[instrument(skip(self), fields(webhook_id = %id))]
    pub async fn delete_webhook(&self, id: &str) -> Result<(), ChannelError> {
        self.delete(&format!("/webhooks/{id}")).await
    }

    // =========================================================================
    // Order methods
    // =========================================================================

    /// Fetch the full order the webhook pointed at.
    ///
    /// Returns `None` on 404.
    ///
    /// # Errors
    ///
    /// Returns an error for any non-2xx response other than 404.
    #[instrument(skip(self), fields(remote_order_id = %id))]
    pub async fn get_order(&self, id: i64) -> Result<Option<RemoteOrder>, ChannelError> {
        match self.get_json(&format!("/orders/{id}")).await {
            Ok(order) => Ok(Some(order)),
            Err(ChannelError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
