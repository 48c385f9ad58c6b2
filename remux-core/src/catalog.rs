//! Queryable view over one extraction's format inventory.

use tracing::trace;

use crate::error::{Error, Result};
use crate::filter::RuleSet;
use crate::info::{MediaFormat, MediaInfo};

/// A validated, filterable view over the formats of one [`MediaInfo`].
///
/// Construction fails when the record carries neither a format inventory
/// nor playlist entries; such a record cannot produce any manifest. A
/// playlist-shaped record without formats is valid and yields an empty
/// format view.
#[derive(Debug)]
pub struct FormatCatalog<'a> {
    info: &'a MediaInfo,
    formats: &'a [MediaFormat],
}

impl<'a> FormatCatalog<'a> {
    pub fn new(info: &'a MediaInfo) -> Result<Self> {
        let formats = match info.formats.as_deref() {
            Some(formats) => formats,
            None if !info.entries.is_empty() => &[],
            None => {
                return Err(Error::input_shape(
                    "media info carries neither formats nor entries",
                ))
            }
        };
        Ok(Self { info, formats })
    }

    /// All formats in original order.
    pub fn formats(&self) -> &'a [MediaFormat] {
        self.formats
    }

    /// Formats passing every rule, in original order. Dropped formats are
    /// reported at trace level and otherwise ignored.
    pub fn select(&self, rules: &RuleSet) -> Vec<&'a MediaFormat> {
        let mut kept = Vec::new();
        for fmt in self.formats {
            match rules.reject_reason(fmt) {
                None => kept.push(fmt),
                Some(rule) => {
                    trace!(format_id = %fmt.format_id, rule, "format dropped");
                }
            }
        }
        kept
    }

    /// Look up a format by id.
    pub fn find(&self, format_id: &str) -> Option<&'a MediaFormat> {
        self.formats.iter().find(|fmt| fmt.format_id == format_id)
    }

    /// The pre-selected format subset, when the extractor already chose.
    pub fn requested(&self) -> &'a [MediaFormat] {
        self.info.requested()
    }

    /// Distinct format languages, the default language first and the rest
    /// in encounter order.
    pub fn languages(&self) -> Vec<&'a str> {
        let mut languages: Vec<&str> = Vec::new();
        for fmt in self.formats {
            if let Some(lang) = fmt.language.as_deref() {
                if !languages.contains(&lang) {
                    languages.push(lang);
                }
            }
        }

        if let Some(default) = self.default_language() {
            if let Some(pos) = languages.iter().position(|lang| *lang == default) {
                languages.remove(pos);
                languages.insert(0, default);
            }
        }

        languages
    }

    /// The language with the highest preference, ties favoring the first
    /// encountered.
    pub fn default_language(&self) -> Option<&'a str> {
        let mut best: Option<(&str, i32)> = None;
        for fmt in self.formats {
            let Some(lang) = fmt.language.as_deref() else {
                continue;
            };
            let preference = fmt.language_preference.unwrap_or(0);
            match best {
                Some((_, top)) if preference <= top => {}
                _ => best = Some((lang, preference)),
            }
        }
        best.map(|(lang, _)| lang)
    }
}
