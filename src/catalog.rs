//! # Catalog Administration
//!
//! Create, sparse update, soft delete and re-activation of ties, plus the
//! start-up seed from a catalog file. Ties are never physically removed;
//! a soft-deleted tie stays readable by id and drops out of the storefront.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{Entity, Field, ShopError, ShopResult, StoreError, ValidationError, ValidationIssue};
use crate::model::{
    NewTie, Tie, TieUpdate, DEFAULT_MATERIAL_EN, DEFAULT_MATERIAL_KZ, DEFAULT_MATERIAL_RU,
};
use crate::store::ShopRepository;

/// Parse an admin-entered price in whole tenge, e.g. `15000` or `15 000 ₸`
pub fn parse_price(input: &str) -> Result<i64, ValidationError> {
    let cleaned: String = input
        .trim()
        .trim_end_matches('₸')
        .trim_end_matches("тг")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Err(ValidationError::new(Field::Price, ValidationIssue::Empty));
    }
    let price: i64 = cleaned
        .parse()
        .map_err(|_| ValidationError::new(Field::Price, ValidationIssue::NotANumber))?;
    if price <= 0 {
        return Err(ValidationError::new(Field::Price, ValidationIssue::NotPositive));
    }
    Ok(price)
}

fn check_price(price: i64) -> Result<(), ValidationError> {
    if price <= 0 {
        Err(ValidationError::new(Field::Price, ValidationIssue::NotPositive))
    } else {
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(ValidationError::new(Field::TieName, ValidationIssue::Empty))
    } else {
        Ok(())
    }
}

/// Add a tie to the catalog as active
pub async fn create_tie<R: ShopRepository>(repo: &R, tie: NewTie) -> ShopResult<Tie> {
    check_name(&tie.name_ru)?;
    check_price(tie.price)?;
    let created = repo.create_tie(tie).await?;
    info!(tie_id = created.id, price = created.price, "Catalog entry created");
    Ok(created)
}

/// Apply only the provided fields
pub async fn update_tie<R: ShopRepository>(repo: &R, id: i64, update: &TieUpdate) -> ShopResult<Tie> {
    if let Some(price) = update.price {
        check_price(price)?;
    }
    if let Some(name) = &update.name_ru {
        check_name(name)?;
    }
    if update.is_empty() {
        return repo
            .get_tie(id)
            .await?
            .ok_or_else(|| ShopError::not_found(Entity::Tie, id));
    }
    let tie = repo
        .update_tie(id, update)
        .await?
        .ok_or_else(|| ShopError::not_found(Entity::Tie, id))?;
    info!(tie_id = id, "Catalog entry updated");
    Ok(tie)
}

/// Hide a tie from customer listings
pub async fn soft_delete_tie<R: ShopRepository>(repo: &R, id: i64) -> ShopResult<Tie> {
    set_active(repo, id, false).await
}

/// Flip a tie between active and hidden
pub async fn toggle_tie<R: ShopRepository>(repo: &R, id: i64) -> ShopResult<Tie> {
    let tie = repo
        .get_tie(id)
        .await?
        .ok_or_else(|| ShopError::not_found(Entity::Tie, id))?;
    set_active(repo, id, !tie.is_active).await
}

async fn set_active<R: ShopRepository>(repo: &R, id: i64, active: bool) -> ShopResult<Tie> {
    let tie = repo
        .set_tie_active(id, active)
        .await?
        .ok_or_else(|| ShopError::not_found(Entity::Tie, id))?;
    info!(tie_id = id, active, "Catalog entry visibility changed");
    Ok(tie)
}

#[derive(Debug, Default, Deserialize)]
struct LocalizedText {
    #[serde(default)]
    ru: String,
    #[serde(default)]
    kz: String,
    #[serde(default)]
    en: String,
}

#[derive(Debug, Deserialize)]
struct SeedTie {
    name: LocalizedText,
    #[serde(default)]
    color: LocalizedText,
    #[serde(default)]
    material: Option<LocalizedText>,
    #[serde(default)]
    description: LocalizedText,
    price: i64,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    ties: Vec<SeedTie>,
}

impl From<SeedTie> for NewTie {
    fn from(seed: SeedTie) -> Self {
        let material = seed.material.unwrap_or_else(|| LocalizedText {
            ru: DEFAULT_MATERIAL_RU.to_string(),
            kz: DEFAULT_MATERIAL_KZ.to_string(),
            en: DEFAULT_MATERIAL_EN.to_string(),
        });
        NewTie {
            name_ru: seed.name.ru,
            name_kz: seed.name.kz,
            name_en: seed.name.en,
            color_ru: seed.color.ru,
            color_kz: seed.color.kz,
            color_en: seed.color.en,
            material_ru: material.ru,
            material_kz: material.kz,
            material_en: material.en,
            description_ru: seed.description.ru,
            description_kz: seed.description.kz,
            description_en: seed.description.en,
            price: seed.price,
            image_path: seed.image.filter(|image| !image.trim().is_empty()),
        }
    }
}

/// Load the catalog file into an empty catalog; returns how many ties were added.
/// A non-empty catalog is left untouched.
pub async fn seed_catalog_if_empty<R: ShopRepository>(repo: &R, path: &Path) -> ShopResult<usize> {
    if repo.count_ties().await? > 0 {
        return Ok(0);
    }
    let bytes = tokio::fs::read(path).await.map_err(StoreError::from)?;
    let seed: SeedFile = serde_json::from_slice(&bytes).map_err(StoreError::from)?;

    let mut created = 0;
    for entry in seed.ties {
        create_tie(repo, entry.into()).await?;
        created += 1;
    }
    info!(path = %path.display(), created, "Catalog seeded");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("15000").unwrap(), 15000);
        assert_eq!(parse_price("15 000 ₸").unwrap(), 15000);
        assert_eq!(parse_price("abc").unwrap_err().issue, ValidationIssue::NotANumber);
        assert_eq!(parse_price("-5").unwrap_err().issue, ValidationIssue::NotPositive);
        assert_eq!(parse_price("  ").unwrap_err().issue, ValidationIssue::Empty);
    }

    #[test]
    fn test_seed_entry_defaults_material() {
        let seed: SeedTie = serde_json::from_str(
            r#"{"name": {"ru": "Классика", "en": "Classic"}, "price": 12000}"#,
        )
        .unwrap();
        let tie: NewTie = seed.into();
        assert_eq!(tie.material_ru, DEFAULT_MATERIAL_RU);
        assert_eq!(tie.name_en, "Classic");
        assert_eq!(tie.image_path, None);
    }
}
