//! Language variants of frame content
//!
//! Every section carries a neutral value plus optional `en` / `zh` variants.
//! The neutral value holds whatever was last edited without a language tag.
//!
//! Resolution order for a requested language:
//! 1. the requested variant, if non-blank
//! 2. the other variant, if non-blank
//! 3. the neutral value

use crate::error::UnknownVariant;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Content language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    En,
    /// Chinese
    Zh,
}

impl Language {
    /// The other supported language
    #[inline]
    #[must_use]
    pub fn other(self) -> Language {
        match self {
            Language::En => Language::Zh,
            Language::Zh => Language::En,
        }
    }

    /// Short code
    #[inline]
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.split(['-', '_']).next().unwrap_or_default() {
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            _ => Err(UnknownVariant::new("language", s)),
        }
    }
}

/// Emptiness test used by language fallback and heuristics
pub trait Blank {
    /// True if the value carries no user content
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Blank for str {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<T: Blank> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.iter().all(Blank::is_blank)
    }
}

impl<T: Blank> Blank for Option<T> {
    fn is_blank(&self) -> bool {
        self.as_ref().map_or(true, Blank::is_blank)
    }
}

/// Pick a language variant with fallback
///
/// Returns `requested` if non-blank, else the other language if non-blank,
/// else `neutral`. Pure; never allocates.
pub fn pick_lang<'a, T: Blank + ?Sized>(
    neutral: &'a T,
    en: Option<&'a T>,
    zh: Option<&'a T>,
    lang: Language,
) -> &'a T {
    let (first, second) = match lang {
        Language::En => (en, zh),
        Language::Zh => (zh, en),
    };
    first
        .filter(|v| !v.is_blank())
        .or_else(|| second.filter(|v| !v.is_blank()))
        .unwrap_or(neutral)
}

/// A value with optional per-language variants
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Localized<T> {
    /// Value last edited without a language tag
    pub neutral: T,
    /// English variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<T>,
    /// Chinese variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zh: Option<T>,
}

impl<T> Localized<T> {
    /// Only a neutral value
    #[inline]
    #[must_use]
    pub fn new(neutral: T) -> Self {
        Self {
            neutral,
            en: None,
            zh: None,
        }
    }

    /// Variant slot for a language
    #[inline]
    #[must_use]
    pub fn variant(&self, lang: Language) -> Option<&T> {
        match lang {
            Language::En => self.en.as_ref(),
            Language::Zh => self.zh.as_ref(),
        }
    }

    /// Set a variant, or the neutral value when `lang` is `None`
    pub fn edit(&mut self, lang: Option<Language>, value: T) {
        match lang {
            None => self.neutral = value,
            Some(Language::En) => self.en = Some(value),
            Some(Language::Zh) => self.zh = Some(value),
        }
    }

    /// Builder form of [`Localized::edit`]
    #[must_use]
    pub fn with_variant(mut self, lang: Language, value: T) -> Self {
        self.edit(Some(lang), value);
        self
    }
}

impl<T: Blank> Localized<T> {
    /// Resolve for display, see [`pick_lang`]
    #[must_use]
    pub fn pick(&self, lang: Language) -> &T {
        pick_lang(&self.neutral, self.en.as_ref(), self.zh.as_ref(), lang)
    }

    /// True if the neutral value and every variant are blank
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neutral.is_blank() && self.en.is_blank() && self.zh.is_blank()
    }
}

impl<T> From<T> for Localized<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> String {
        v.to_string()
    }

    #[test]
    fn pick_requested_variant_first() {
        let (n, en, zh) = (s("neutral"), s("english"), s("中文"));
        assert_eq!(pick_lang(&n, Some(&en), Some(&zh), Language::Zh), "中文");
        assert_eq!(pick_lang(&n, Some(&en), Some(&zh), Language::En), "english");
    }

    #[test]
    fn pick_falls_back_to_other_language() {
        let (n, en, zh) = (s("neutral"), s("english"), s(""));
        assert_eq!(pick_lang(&n, Some(&en), Some(&zh), Language::Zh), "english");
        assert_eq!(pick_lang(&n, None, Some(&s("中文")), Language::En), "中文");
    }

    #[test]
    fn pick_falls_back_to_neutral() {
        let n = s("neutral");
        assert_eq!(pick_lang(&n, None, None, Language::En), "neutral");
        assert_eq!(pick_lang(&n, Some(&s("  ")), Some(&s("\n")), Language::Zh), "neutral");
    }

    #[test]
    fn localized_edit_targets_slot() {
        let mut value = Localized::new(s("base"));
        value.edit(Some(Language::Zh), s("中文"));
        value.edit(None, s("rewritten"));
        assert_eq!(value.neutral, "rewritten");
        assert_eq!(value.variant(Language::Zh).map(String::as_str), Some("中文"));
        assert_eq!(value.variant(Language::En), None);
        assert_eq!(value.pick(Language::En), "中文");
    }

    #[test]
    fn localized_emptiness() {
        assert!(Localized::<String>::default().is_empty());
        assert!(!Localized::new(s("")).with_variant(Language::En, s("x")).is_empty());
    }

    #[test]
    fn language_parse() {
        assert_eq!("zh-CN".parse::<Language>(), Ok(Language::Zh));
        assert_eq!("EN".parse::<Language>(), Ok(Language::En));
        assert!("fr".parse::<Language>().is_err());
    }
}
