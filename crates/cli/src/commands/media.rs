//! Media store commands.

use std::path::Path;

use freshmall_core::SkuId;
use freshmall_storefront::config::MediaConfig;
use freshmall_storefront::db::GoodsRepository;
use freshmall_storefront::storage::MediaStorage;

/// Store `file` in the media store and make it the image of `sku_id`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or stored, or the SKU does
/// not exist.
pub async fn upload(sku_id: i32, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let storage = MediaStorage::from_config(&MediaConfig::load());

    let bytes = tokio::fs::read(file).await?;
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let id = storage.save(name, &bytes).await?;
    tracing::info!(file_id = %id, "Stored {}", file.display());

    let pool = super::connect().await?;
    GoodsRepository::new(&pool)
        .set_sku_image(SkuId::new(sku_id), &id)
        .await?;

    tracing::info!(sku_id, url = %storage.url(&id), "SKU image updated");
    Ok(())
}
