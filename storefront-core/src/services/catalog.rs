//! Catalog store - product listing and admin product management

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::watch;

use crate::domain::result::{Error, Result};
use crate::domain::{NewProduct, Product};
use crate::ports::{ApiRequest, Notifier};
use crate::services::api_client::ApiClient;

/// Observable catalog state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogState {
    pub products: Vec<Product>,
    /// Number of catalog actions currently in flight
    pending: usize,
}

impl CatalogState {
    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }
}

/// `GET /products/featured` wraps the list; tolerate a bare array as well
#[derive(Deserialize)]
#[serde(untagged)]
enum FeaturedResponse {
    Wrapped { products: Vec<Product> },
    Bare(Vec<Product>),
}

impl FeaturedResponse {
    fn into_products(self) -> Vec<Product> {
        match self {
            FeaturedResponse::Wrapped { products } | FeaturedResponse::Bare(products) => products,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeaturedToggle {
    is_featured: bool,
}

/// Counts one in-flight action for as long as it lives
struct Loading<'a> {
    tx: &'a watch::Sender<CatalogState>,
}

impl<'a> Loading<'a> {
    fn begin(tx: &'a watch::Sender<CatalogState>) -> Self {
        tx.send_modify(|s| s.pending += 1);
        Self { tx }
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.tx.send_modify(|s| s.pending = s.pending.saturating_sub(1));
    }
}

/// Catalog store
pub struct CatalogStore {
    api: Arc<ApiClient>,
    tx: watch::Sender<CatalogState>,
    notifier: Arc<dyn Notifier>,
}

impl CatalogStore {
    pub fn new(api: Arc<ApiClient>, notifier: Arc<dyn Notifier>) -> Self {
        let (tx, _rx) = watch::channel(CatalogState::default());
        Self { api, tx, notifier }
    }

    pub fn snapshot(&self) -> CatalogState {
        self.tx.borrow().clone()
    }

    pub fn products(&self) -> Vec<Product> {
        self.tx.borrow().products.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().is_loading()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.tx.subscribe()
    }

    pub async fn fetch_all(&self) -> Result<()> {
        let _loading = Loading::begin(&self.tx);
        let fetched = self.api.send_json::<Vec<Product>>(ApiRequest::get("/products/")).await;
        self.replace(fetched, "Failed to fetch products")
    }

    pub async fn fetch_by_category(&self, category: &str) -> Result<()> {
        let _loading = Loading::begin(&self.tx);
        let fetched = match category_path(category) {
            Ok(path) => self.api.send_json::<Vec<Product>>(ApiRequest::get(path)).await,
            Err(e) => Err(e),
        };
        self.replace(fetched, "Failed to fetch products")
    }

    pub async fn fetch_featured(&self) -> Result<()> {
        let _loading = Loading::begin(&self.tx);
        let fetched = self
            .api
            .send_json::<FeaturedResponse>(ApiRequest::get("/products/featured"))
            .await
            .map(FeaturedResponse::into_products);
        self.replace(fetched, "Failed to fetch featured products")
    }

    /// Create a product and append the server's record to the cache
    pub async fn create(&self, product: &NewProduct) -> Result<Product> {
        let _loading = Loading::begin(&self.tx);

        let created = match ApiRequest::post("/products/").json(product) {
            Ok(request) => self.api.send_json::<Product>(request).await,
            Err(e) => Err(e),
        };

        match created {
            Ok(product) => {
                tracing::info!(product_id = %product.id, "product created");
                let record = product.clone();
                self.tx.send_modify(|s| s.products.push(record));
                self.notifier.success("Product created successfully!");
                Ok(product)
            }
            Err(e) => Err(self.fail(e, "Failed to create product")),
        }
    }

    /// Delete a product and drop it from the cache
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = id.trim();
        let _loading = Loading::begin(&self.tx);

        let deleted = match product_path(id) {
            Ok(path) => self.api.send(ApiRequest::delete(path)).await,
            Err(e) => Err(e),
        };

        match deleted {
            Ok(_) => {
                tracing::info!(product_id = %id, "product deleted");
                self.tx.send_modify(|s| s.products.retain(|p| p.id != id));
                self.notifier.success("Product deleted successfully!");
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Failed to delete product")),
        }
    }

    /// Flip a product's featured flag; returns the new value
    pub async fn toggle_featured(&self, id: &str) -> Result<bool> {
        let id = id.trim();
        let _loading = Loading::begin(&self.tx);

        let toggled = match product_path(id) {
            Ok(path) => self.api.send_json::<FeaturedToggle>(ApiRequest::patch(path)).await,
            Err(e) => Err(e),
        };

        match toggled {
            Ok(FeaturedToggle { is_featured }) => {
                tracing::info!(product_id = %id, is_featured, "product featured flag updated");
                self.tx.send_modify(|s| {
                    if let Some(product) = s.products.iter_mut().find(|p| p.id == id) {
                        product.is_featured = is_featured;
                    }
                });
                self.notifier.success("Product updated successfully!");
                Ok(is_featured)
            }
            Err(e) => Err(self.fail(e, "Failed to update product")),
        }
    }

    fn replace(&self, fetched: Result<Vec<Product>>, fallback: &str) -> Result<()> {
        match fetched {
            Ok(products) => {
                tracing::debug!(count = products.len(), "catalog replaced");
                self.tx.send_modify(|s| s.products = products);
                Ok(())
            }
            Err(e) => Err(self.fail(e, fallback)),
        }
    }

    fn fail(&self, err: Error, fallback: &str) -> Error {
        tracing::debug!(error = %err, "catalog action failed");
        self.notifier.error(&err.user_message(fallback));
        err
    }
}

/// Path segments are interpolated verbatim, so reject anything that would
/// change the route
fn path_segment<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() || value.contains(['/', '?', '#']) {
        return Err(Error::validation(format!("Invalid {}: {:?}", what, value)));
    }
    Ok(value)
}

fn category_path(category: &str) -> Result<String> {
    Ok(format!("/products/category/{}", path_segment(category, "category")?))
}

fn product_path(id: &str) -> Result<String> {
    Ok(format!("/products/{}", path_segment(id, "product id")?))
}
