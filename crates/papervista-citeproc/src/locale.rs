//! Locale management for CSL term lookup.
//!
//! Terms come from the style's own `<locale>` overrides first and then from
//! the embedded locale files.

use once_cell::sync::Lazy;
use papervista_csl::{Locale, Style, TermForm, parse_locale};
use rust_embed::Embed;

/// Embedded locale files from the locales/ directory.
#[derive(Embed)]
#[folder = "locales/"]
#[include = "*.xml"]
struct LocaleFiles;

const FALLBACK_LANG: &str = "en-US";

static EN_US: Lazy<Option<Locale>> = Lazy::new(|| match load_embedded_locale(FALLBACK_LANG) {
    Ok(locale) => locale,
    Err(e) => {
        tracing::error!(error = %e, "Embedded en-US locale failed to parse");
        None
    }
});

/// Load and parse an embedded locale by language tag.
pub fn load_embedded_locale(lang: &str) -> papervista_csl::Result<Option<Locale>> {
    let Some(file) = LocaleFiles::get(&format!("{}.xml", lang)) else {
        return Ok(None);
    };
    let content = String::from_utf8_lossy(&file.data);
    parse_locale(&content).map(Some)
}

/// Term lookup for one style.
pub struct LocaleManager {
    /// Locales in lookup priority order.
    locales: Vec<Locale>,
}

impl LocaleManager {
    /// Build the lookup chain for `style`: matching style overrides, then the
    /// embedded locale for the style's default language, then en-US.
    pub fn for_style(style: &Style) -> papervista_csl::Result<Self> {
        let lang = style.default_locale.as_deref().unwrap_or(FALLBACK_LANG);
        let base = lang.split('-').next().unwrap_or(lang);

        // Overrides without xml:lang apply to every language
        let mut locales: Vec<Locale> = style
            .locales
            .iter()
            .filter(|l| match l.lang.as_deref() {
                None => true,
                Some(l) => l == lang || l == base,
            })
            .cloned()
            .collect();
        // Exact language matches take precedence over base-language ones
        locales.sort_by_key(|l| match l.lang.as_deref() {
            Some(l) if l == lang => 0,
            Some(_) => 1,
            None => 2,
        });

        if lang != FALLBACK_LANG
            && let Some(locale) = load_embedded_locale(lang)?
        {
            locales.push(locale);
        }
        if let Some(en_us) = EN_US.as_ref() {
            locales.push(en_us.clone());
        }

        Ok(Self { locales })
    }

    /// Get a term, falling back through the CSL form chain
    /// (verb-short -> verb -> long, symbol -> short -> long, short -> long).
    pub fn get_term(&self, name: &str, form: TermForm, plural: bool) -> Option<String> {
        form_chain(form).iter().find_map(|form| {
            self.locales.iter().find_map(|locale| {
                locale
                    .terms
                    .iter()
                    .find(|t| t.name == name && t.form == *form)
                    .and_then(|t| t.text(plural))
                    .map(str::to_string)
            })
        })
    }

    /// Whether punctuation following a closing quote moves inside it.
    pub fn punctuation_in_quote(&self) -> bool {
        self.locales
            .iter()
            .find_map(|l| l.punctuation_in_quote)
            .unwrap_or(false)
    }
}

fn form_chain(form: TermForm) -> &'static [TermForm] {
    match form {
        TermForm::Long => &[TermForm::Long],
        TermForm::Short => &[TermForm::Short, TermForm::Long],
        TermForm::Verb => &[TermForm::Verb, TermForm::Long],
        TermForm::VerbShort => &[TermForm::VerbShort, TermForm::Verb, TermForm::Long],
        TermForm::Symbol => &[TermForm::Symbol, TermForm::Short, TermForm::Long],
    }
}
