//! Seed the catalogue from a YAML file.
//!
//! ```yaml
//! types:
//!   - name: Fruit
//!     logo: fruit
//! goods:
//!   - name: Strawberry
//!     detail: Sweet greenhouse strawberries.
//!     skus:
//!       - name: Strawberry 500g
//!         type: Fruit
//!         price: "29.90"
//!         unite: 500g
//!         stock: 120
//! ```
//!
//! Types that already exist are reused. Goods and SKUs are always inserted.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use freshmall_core::{Price, SkuStatus};
use freshmall_storefront::db::{GoodsRepository, RepositoryError};
use freshmall_storefront::models::goods::{NewGoodsType, NewSku};

/// A catalogue file.
#[derive(Debug, Deserialize)]
pub struct Catalogue {
    #[serde(default)]
    pub types: Vec<TypeEntry>,
    #[serde(default)]
    pub goods: Vec<GoodsEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct GoodsEntry {
    pub name: String,
    #[serde(default)]
    pub detail: String,
    pub skus: Vec<SkuEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SkuEntry {
    pub name: String,
    /// Name of the goods type.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    pub unite: String,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub status: SkuStatus,
}

/// Check a catalogue for problems the database would reject or that are
/// almost certainly mistakes.
#[must_use]
pub fn validate(catalogue: &Catalogue) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for t in &catalogue.types {
        if t.name.trim().is_empty() {
            errors.push("goods type with empty name".to_string());
        } else if !seen.insert(t.name.as_str()) {
            errors.push(format!("duplicate goods type: {}", t.name));
        }
    }

    for goods in &catalogue.goods {
        if goods.skus.is_empty() {
            errors.push(format!("goods {} has no SKUs", goods.name));
        }
        for sku in &goods.skus {
            if !seen.contains(sku.type_name.as_str()) {
                errors.push(format!("SKU {} uses unknown type {}", sku.name, sku.type_name));
            }
            if sku.price < Price::ZERO {
                errors.push(format!("SKU {} has a negative price", sku.name));
            }
            if sku.stock < 0 {
                errors.push(format!("SKU {} has negative stock", sku.name));
            }
        }
    }

    errors
}

/// Seed goods types, goods and SKUs from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database operation fails.
pub async fn goods(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!(path = %path.display(), "Loading catalogue from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let catalogue: Catalogue = serde_yaml::from_str(&content)?;

    let errors = validate(&catalogue);
    if !errors.is_empty() {
        error!("Catalogue validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = super::connect().await?;
    let repo = GoodsRepository::new(&pool);

    let mut type_ids = std::collections::HashMap::new();
    for t in &catalogue.types {
        let new_type = NewGoodsType {
            name: t.name.clone(),
            logo: t.logo.clone(),
            image: t.image.clone(),
        };
        let id = match repo.create_type(&new_type).await {
            Ok(id) => id,
            Err(RepositoryError::Conflict(_)) => repo
                .find_type_by_name(&t.name)
                .await?
                .ok_or_else(|| format!("goods type {} vanished", t.name))?,
            Err(e) => return Err(e.into()),
        };
        type_ids.insert(t.name.as_str(), id);
    }

    let mut sku_count = 0_usize;
    for goods in &catalogue.goods {
        let goods_id = repo.create_goods(&goods.name, &goods.detail).await?;
        for sku in &goods.skus {
            let type_id = *type_ids
                .get(sku.type_name.as_str())
                .ok_or_else(|| format!("unknown type {}", sku.type_name))?;
            let id = repo
                .create_sku(&NewSku {
                    type_id,
                    goods_id,
                    name: sku.name.clone(),
                    description: sku.description.clone(),
                    price: sku.price,
                    unite: sku.unite.clone(),
                    image: String::new(),
                    stock: sku.stock,
                    status: sku.status,
                })
                .await?;
            info!(sku_id = %id, name = %sku.name, "SKU created");
            sku_count += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Types: {}", type_ids.len());
    info!("  Goods: {}", catalogue.goods.len());
    info!("  SKUs: {sku_count}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
types:
  - name: Fruit
    logo: fruit
goods:
  - name: Strawberry
    detail: Sweet greenhouse strawberries.
    skus:
      - name: Strawberry 500g
        type: Fruit
        price: "29.90"
        unite: 500g
        stock: 120
      - name: Strawberry 1kg
        type: Fruit
        price: "55.00"
        unite: 1kg
        status: offline
"#;

    #[test]
    fn test_parse_sample() {
        let catalogue: Catalogue = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(catalogue.types.len(), 1);
        let skus = &catalogue.goods[0].skus;
        assert_eq!(skus[0].price.to_string(), "29.90");
        assert_eq!(skus[0].status, SkuStatus::Online);
        assert_eq!(skus[1].status, SkuStatus::Offline);
        assert_eq!(skus[1].stock, 0);
        assert!(validate(&catalogue).is_empty());
    }

    #[test]
    fn test_validate_reports_unknown_type() {
        let mut catalogue: Catalogue = serde_yaml::from_str(SAMPLE).unwrap();
        catalogue.goods[0].skus[0].type_name = "Seafood".to_string();
        let errors = validate(&catalogue);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("unknown type Seafood"));
    }

    #[test]
    fn test_validate_reports_duplicates_and_empty_goods() {
        let catalogue: Catalogue = serde_yaml::from_str(
            r"
types:
  - name: Fruit
  - name: Fruit
goods:
  - name: Nothing
    skus: []
",
        )
        .unwrap();
        let errors = validate(&catalogue);
        assert!(errors.iter().any(|e| e.contains("duplicate goods type")));
        assert!(errors.iter().any(|e| e.contains("has no SKUs")));
    }
}
