use serde::{Deserialize, Deserializer, Serialize};

use crate::services::reconcile::Keyed;

/// Column names in file order.
pub const COLUMNS: [&str; 11] = [
    "id",
    "title_romaji",
    "title_english",
    "title_native",
    "title_synonyms",
    "start_year",
    "genres",
    "tags",
    "description",
    "cover_image_url",
    "site_url",
];

/// One catalog entry as stored in the snapshot and accumulation files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub title_romaji: Option<String>,
    pub title_english: Option<String>,
    pub title_native: Option<String>,
    #[serde(default)]
    pub title_synonyms: String,
    #[serde(default, deserialize_with = "lenient_year")]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub genres: String,
    #[serde(default)]
    pub tags: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub site_url: String,
}

impl Keyed for Record {
    fn key(&self) -> i64 {
        self.id
    }
}

/// Accepts `2015` as well as the `2015.0` that float-typed exporters write.
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(year) = raw.parse::<i32>() {
        return Ok(Some(year));
    }
    match raw.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value.abs() <= f64::from(i32::MAX) => {
            Ok(Some(value as i32))
        }
        _ => Err(serde::de::Error::custom(format!("invalid year: {raw}"))),
    }
}

/// Builds the public page URL for a manga entry.
///
/// Spaces in the romaji title become hyphens; no other slugification is
/// applied. Entries without a romaji title get the id-only form.
#[must_use]
pub fn site_url(site_base: &str, id: i64, romaji: Option<&str>) -> String {
    let base = site_base.trim_end_matches('/');
    match romaji {
        Some(title) if !title.is_empty() => {
            format!("{base}/manga/{id}/{}/", title.replace(' ', "-"))
        }
        _ => format!("{base}/manga/{id}/"),
    }
}

/// Picks the first present cover variant, largest first.
#[must_use]
pub fn pick_cover(variants: [Option<&str>; 3]) -> Option<String> {
    variants
        .into_iter()
        .flatten()
        .find(|url| !url.is_empty())
        .map(str::to_string)
}
