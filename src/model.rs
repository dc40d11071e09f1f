//! # Shop Data Model
//!
//! Users, ties and orders as shared by both store backends, the bot and the
//! web console.
//!
//! ## Core Concepts
//!
//! - **User**: a buyer keyed by their Telegram id, with a language preference
//! - **Tie**: a catalog entry with text in three languages; soft deleted by
//!   clearing `is_active`
//! - **Order**: a point-in-time contract; the tie name and price are copied at
//!   creation and never follow later catalog edits

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkout::CheckoutDetails;
use crate::order_lifecycle::OrderStatus;

pub const DEFAULT_MATERIAL_RU: &str = "100% натуральный материал";
pub const DEFAULT_MATERIAL_KZ: &str = "100% табиғи материал";
pub const DEFAULT_MATERIAL_EN: &str = "100% natural material";

/// Supported interface languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ru,
    Kz,
    En,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Ru, Language::Kz, Language::En];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::Kz => "kz",
            Language::En => "en",
        }
    }

    /// Parse a language code, accepting region suffixes and the ISO `kk` code
    pub fn from_code(code: &str) -> Option<Language> {
        let primary = code
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "ru" => Some(Language::Ru),
            "kz" | "kk" => Some(Language::Kz),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    /// Resolve an optional client language code, falling back to the default
    pub fn detect(code: Option<&str>) -> Language {
        code.and_then(Language::from_code).unwrap_or_default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A buyer known to the shop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub telegram_id: i64,
    pub display_name: Option<String>,
    pub language: Language,
    pub created_at: DateTime<Utc>,
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tie {
    pub id: i64,
    pub name_ru: String,
    pub name_kz: String,
    pub name_en: String,
    pub color_ru: String,
    pub color_kz: String,
    pub color_en: String,
    pub material_ru: String,
    pub material_kz: String,
    pub material_en: String,
    pub description_ru: String,
    pub description_kz: String,
    pub description_en: String,
    pub price: i64,
    pub image_path: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Pick the value for `lang`, falling back to the Russian text when empty
fn localized<'a>(ru: &'a str, kz: &'a str, en: &'a str, lang: Language) -> &'a str {
    let value = match lang {
        Language::Ru => ru,
        Language::Kz => kz,
        Language::En => en,
    };
    if value.trim().is_empty() {
        ru
    } else {
        value
    }
}

impl Tie {
    pub fn name(&self, lang: Language) -> &str {
        localized(&self.name_ru, &self.name_kz, &self.name_en, lang)
    }

    pub fn color(&self, lang: Language) -> &str {
        localized(&self.color_ru, &self.color_kz, &self.color_en, lang)
    }

    pub fn material(&self, lang: Language) -> &str {
        localized(&self.material_ru, &self.material_kz, &self.material_en, lang)
    }

    pub fn description(&self, lang: Language) -> &str {
        localized(
            &self.description_ru,
            &self.description_kz,
            &self.description_en,
            lang,
        )
    }
}

/// Fields for a new catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTie {
    pub name_ru: String,
    #[serde(default)]
    pub name_kz: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub color_ru: String,
    #[serde(default)]
    pub color_kz: String,
    #[serde(default)]
    pub color_en: String,
    #[serde(default = "default_material_ru")]
    pub material_ru: String,
    #[serde(default = "default_material_kz")]
    pub material_kz: String,
    #[serde(default = "default_material_en")]
    pub material_en: String,
    #[serde(default)]
    pub description_ru: String,
    #[serde(default)]
    pub description_kz: String,
    #[serde(default)]
    pub description_en: String,
    pub price: i64,
    #[serde(default)]
    pub image_path: Option<String>,
}

fn default_material_ru() -> String {
    DEFAULT_MATERIAL_RU.to_string()
}

fn default_material_kz() -> String {
    DEFAULT_MATERIAL_KZ.to_string()
}

fn default_material_en() -> String {
    DEFAULT_MATERIAL_EN.to_string()
}

impl NewTie {
    /// Build a tie whose text is the same in every language
    pub fn same_in_all_languages(
        name: &str,
        color: &str,
        description: &str,
        price: i64,
        image_path: Option<String>,
    ) -> Self {
        Self {
            name_ru: name.to_string(),
            name_kz: name.to_string(),
            name_en: name.to_string(),
            color_ru: color.to_string(),
            color_kz: color.to_string(),
            color_en: color.to_string(),
            material_ru: default_material_ru(),
            material_kz: default_material_kz(),
            material_en: default_material_en(),
            description_ru: description.to_string(),
            description_kz: description.to_string(),
            description_en: description.to_string(),
            price,
            image_path,
        }
    }
}

/// Sparse set of tie fields to change; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TieUpdate {
    pub name_ru: Option<String>,
    pub name_kz: Option<String>,
    pub name_en: Option<String>,
    pub color_ru: Option<String>,
    pub color_kz: Option<String>,
    pub color_en: Option<String>,
    pub material_ru: Option<String>,
    pub material_kz: Option<String>,
    pub material_en: Option<String>,
    pub description_ru: Option<String>,
    pub description_kz: Option<String>,
    pub description_en: Option<String>,
    pub price: Option<i64>,
    pub image_path: Option<String>,
}

impl TieUpdate {
    pub fn is_empty(&self) -> bool {
        *self == TieUpdate::default()
    }

    /// Apply the provided fields to `tie` in place
    pub fn apply_to(&self, tie: &mut Tie) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut tie.name_ru, &self.name_ru);
        set(&mut tie.name_kz, &self.name_kz);
        set(&mut tie.name_en, &self.name_en);
        set(&mut tie.color_ru, &self.color_ru);
        set(&mut tie.color_kz, &self.color_kz);
        set(&mut tie.color_en, &self.color_en);
        set(&mut tie.material_ru, &self.material_ru);
        set(&mut tie.material_kz, &self.material_kz);
        set(&mut tie.material_en, &self.material_en);
        set(&mut tie.description_ru, &self.description_ru);
        set(&mut tie.description_kz, &self.description_kz);
        set(&mut tie.description_en, &self.description_en);
        set(&mut tie.price, &self.price);
        if let Some(image_path) = &self.image_path {
            tie.image_path = Some(image_path.clone());
        }
    }
}

/// Tie attributes an admin can edit one at a time from the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieField {
    Name,
    Color,
    Material,
    Description,
    Price,
    Photo,
}

impl TieField {
    pub const ALL: [TieField; 6] = [
        TieField::Name,
        TieField::Color,
        TieField::Material,
        TieField::Description,
        TieField::Price,
        TieField::Photo,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            TieField::Name => "name",
            TieField::Color => "color",
            TieField::Material => "material",
            TieField::Description => "desc",
            TieField::Price => "price",
            TieField::Photo => "photo",
        }
    }

    pub fn from_code(code: &str) -> Option<TieField> {
        TieField::ALL.iter().copied().find(|field| field.code() == code)
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            TieField::Name => "tie-field-name",
            TieField::Color => "tie-field-color",
            TieField::Material => "tie-field-material",
            TieField::Description => "tie-field-description",
            TieField::Price => "tie-field-price",
            TieField::Photo => "tie-field-photo",
        }
    }
}

/// A purchase record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub buyer_id: i64,
    pub tie_id: i64,
    pub tie_name: String,
    pub price: i64,
    pub recipient_name: String,
    pub recipient_surname: String,
    pub recipient_phone: String,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub delivery_days: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn recipient_full_name(&self) -> String {
        format!("{} {}", self.recipient_name, self.recipient_surname)
    }
}

/// Fields for a new order, with the tie snapshot taken at checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub buyer_id: i64,
    pub tie_id: i64,
    pub tie_name: String,
    pub price: i64,
    pub recipient_name: String,
    pub recipient_surname: String,
    pub recipient_phone: String,
    pub delivery_address: String,
}

impl NewOrder {
    /// Snapshot `tie` for `buyer_id` with validated checkout details
    pub fn snapshot(buyer_id: i64, tie: &Tie, details: &CheckoutDetails) -> Self {
        Self {
            buyer_id,
            tie_id: tie.id,
            tie_name: tie.name_ru.clone(),
            price: tie.price,
            recipient_name: details.name.clone(),
            recipient_surname: details.surname.clone(),
            recipient_phone: details.phone.clone(),
            delivery_address: details.address.clone(),
        }
    }
}

/// Format a whole-tenge amount with thousands separators, e.g. `15 000`
pub fn format_price(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tie() -> Tie {
        Tie {
            id: 1,
            name_ru: "Классический".to_string(),
            name_kz: String::new(),
            name_en: "Classic".to_string(),
            color_ru: "Синий".to_string(),
            color_kz: "Көк".to_string(),
            color_en: "Blue".to_string(),
            material_ru: DEFAULT_MATERIAL_RU.to_string(),
            material_kz: DEFAULT_MATERIAL_KZ.to_string(),
            material_en: DEFAULT_MATERIAL_EN.to_string(),
            description_ru: "Описание".to_string(),
            description_kz: "Сипаттама".to_string(),
            description_en: "Description".to_string(),
            price: 15000,
            image_path: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_localized_fallback_to_russian() {
        let tie = sample_tie();
        assert_eq!(tie.name(Language::En), "Classic");
        assert_eq!(tie.name(Language::Kz), "Классический");
        assert_eq!(tie.color(Language::Kz), "Көк");
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::detect(Some("en-US")), Language::En);
        assert_eq!(Language::detect(Some("kk")), Language::Kz);
        assert_eq!(Language::detect(Some("de")), Language::Ru);
        assert_eq!(Language::detect(None), Language::Ru);
    }

    #[test]
    fn test_tie_update_applies_only_provided_fields() {
        let mut tie = sample_tie();
        let update = TieUpdate {
            price: Some(20000),
            ..Default::default()
        };
        update.apply_to(&mut tie);
        assert_eq!(tie.price, 20000);
        assert_eq!(tie.name_ru, "Классический");
        assert!(TieUpdate::default().is_empty());
        assert!(!update.is_empty());
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(15000), "15 000");
        assert_eq!(format_price(999), "999");
        assert_eq!(format_price(1234567), "1 234 567");
    }
}
