//! # Localization Module
//!
//! Fluent bundles for the three shop languages. Message files are embedded at
//! compile time from `locales/<lang>/main.ftl`; lookups in an unknown
//! language use Russian, and unknown keys render as
//! `Missing translation: <key>`.

use std::collections::HashMap;
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use tracing::{error, warn};
use unic_langid::LanguageIdentifier;

use crate::model::Language;

const RU_FTL: &str = include_str!("../locales/ru/main.ftl");
const KZ_FTL: &str = include_str!("../locales/kz/main.ftl");
const EN_FTL: &str = include_str!("../locales/en/main.ftl");

/// Localization manager for the shop
pub struct LocalizationManager {
    bundles: HashMap<Language, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every supported language loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();
        for (language, locale, source) in [
            (Language::Ru, "ru", RU_FTL),
            (Language::Kz, "kk", KZ_FTL),
            (Language::En, "en", EN_FTL),
        ] {
            let locale: LanguageIdentifier = locale
                .parse()
                .with_context(|| format!("invalid locale identifier {locale}"))?;
            bundles.insert(language, Self::create_bundle(locale, source)?);
        }
        Ok(Self { bundles })
    }

    fn empty() -> Self {
        Self {
            bundles: HashMap::new(),
        }
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: LanguageIdentifier, source: &str) -> Result<FluentBundle<FluentResource>> {
        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("failed to parse {locale} messages: {errors:?}"))?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Plain chat text; no bidi isolation marks around arguments
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("duplicate {locale} messages: {errors:?}"))?;
        Ok(bundle)
    }

    /// Get a localized message in `language`, falling back to Russian
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: Language,
        args: Option<&HashMap<&str, String>>,
    ) -> String {
        let Some(bundle) = self
            .bundles
            .get(&language)
            .filter(|bundle| bundle.has_message(key))
            .or_else(|| self.bundles.get(&Language::Ru))
        else {
            return format!("Missing translation: {key}");
        };

        let Some(pattern) = bundle.get_message(key).and_then(|msg| msg.value()) else {
            return format!("Missing translation: {key}");
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(value.as_str()));
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key, ?errors, "Errors while formatting message");
        }
        value.into_owned()
    }
}

static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager
pub fn init_localization() -> Result<()> {
    let manager = LocalizationManager::new()?;
    // A second call keeps the first manager
    let _ = LOCALIZATION_MANAGER.set(manager);
    Ok(())
}

/// Get the global localization manager, loading it on first use
pub fn get_localization_manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER.get_or_init(|| {
        LocalizationManager::new().unwrap_or_else(|e| {
            error!(error = %e, "Failed to load localization bundles");
            LocalizationManager::empty()
        })
    })
}

/// Localized message without arguments
pub fn t_lang(key: &str, language: Language) -> String {
    get_localization_manager().get_message_in_language(key, language, None)
}

/// Localized message with named string arguments
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language: Language) -> String {
    let args: HashMap<&str, String> = args
        .iter()
        .map(|(name, value)| (*name, value.to_string()))
        .collect();
    get_localization_manager().get_message_in_language(key, language, Some(&args))
}
