//! Catalogue pages: the index listing and SKU detail.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;

use freshmall_core::SkuId;

use crate::db::{GoodsRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::MaybeUser;
use crate::models::{CurrentUser, GoodsSku};
use crate::state::AppState;
use crate::storage::MediaStorage;

/// Number of SKUs on the index page.
const INDEX_LIMIT: i64 = 12;

/// Cache key of the index listing.
const INDEX_CACHE_KEY: &str = "index";

/// SKU summary for listings.
#[derive(Debug, Clone)]
pub struct SkuCard {
    pub id: SkuId,
    pub name: String,
    pub price: String,
    pub unite: String,
    pub image_url: Option<String>,
}

impl SkuCard {
    /// Build the listing view of a SKU.
    #[must_use]
    pub fn new(sku: &GoodsSku, storage: &MediaStorage) -> Self {
        Self {
            id: sku.id,
            name: sku.name.clone(),
            price: sku.price.to_string(),
            unite: sku.unite.clone(),
            image_url: (!sku.image.is_empty()).then(|| storage.url(&sku.image)),
        }
    }
}

/// Index page template.
#[derive(Template, WebTemplate)]
#[template(path = "goods/index.html")]
pub struct IndexTemplate {
    pub user: Option<CurrentUser>,
    pub skus: Vec<SkuCard>,
}

/// SKU detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "goods/detail.html")]
pub struct DetailTemplate {
    pub user: Option<CurrentUser>,
    pub sku: SkuCard,
    pub description: String,
    pub stock: i32,
    pub sales: i32,
}

/// Display the index page.
///
/// The listing is cached in-process for a few minutes.
#[instrument(skip(state, user))]
pub async fn index(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Result<IndexTemplate> {
    let pool = state.pool().clone();
    let skus = state
        .index_cache()
        .try_get_with(INDEX_CACHE_KEY, async move {
            GoodsRepository::new(&pool)
                .latest_online(INDEX_LIMIT)
                .await
                .map(Arc::new)
        })
        .await
        .map_err(|e: Arc<RepositoryError>| AppError::Internal(format!("index listing: {e}")))?;

    Ok(IndexTemplate {
        user,
        skus: skus
            .iter()
            .map(|sku| SkuCard::new(sku, state.storage()))
            .collect(),
    })
}

/// Display a SKU and remember it in the viewer's history.
#[instrument(skip(state, user))]
pub async fn detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(sku_id): Path<String>,
) -> Result<DetailTemplate> {
    let sku_id = sku_id
        .parse::<i32>()
        .map(SkuId::new)
        .map_err(|_| AppError::NotFound(format!("sku {sku_id}")))?;
    let sku = GoodsRepository::new(state.pool())
        .get_sku(sku_id)
        .await?
        .filter(GoodsSku::is_online)
        .ok_or_else(|| AppError::NotFound(format!("sku {sku_id}")))?;

    if let Some(user) = &user
        && let Err(e) = state.history().record(user.id, sku.id).await
    {
        tracing::warn!(error = %e, "Failed to record browsing history");
    }

    Ok(DetailTemplate {
        user,
        sku: SkuCard::new(&sku, state.storage()),
        description: sku.description,
        stock: sku.stock,
        sales: sku.sales,
    })
}
