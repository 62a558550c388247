//! Catalog data shared by the tool server, the orchestrator, and the display.
//!
//! Upstream records are heterogeneous: fields go missing, change type, or show
//! up as `null`. Everything here is parsed leniently so that a single odd
//! record degrades to "field not present" instead of failing a whole page.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed page size used against the product catalog and reported to callers.
pub const PRODUCTS_PER_PAGE: u32 = 100;

/// Episode field names accepted by the `fields` projection of the episode tool.
pub const VALID_EPISODE_FIELDS: [&str; 11] = [
    "Season",
    "Episode Number (Broadcast Order)",
    "Episode Number (Internal)",
    "Episode Title",
    "Air Date",
    "imagePath",
    "Summary",
    "Animals Featured",
    "Creature Powers",
    "Locations",
    "streamingUrls",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedText {
    #[serde(default, deserialize_with = "lenient::string")]
    pub rendered: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retailer {
    #[serde(default, deserialize_with = "lenient::string")]
    pub retailer_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub product_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "lenient::number")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub link: String,
    #[serde(default)]
    pub title: RenderedText,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub featured_image: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_strings"
    )]
    pub product_categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retailers: Option<Vec<Retailer>>,
}

impl Product {
    /// Projects a raw catalog record down to the product shape, dropping every
    /// other upstream field. Returns `None` for records that are not objects.
    pub fn from_upstream(record: &Value) -> Option<Product> {
        let object = record.as_object()?;
        let title = match object.get("title") {
            Some(Value::Object(title)) => title
                .get("rendered")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Some(Value::String(title)) => title.clone(),
            _ => String::new(),
        };
        let retailers = object.get("retailers").and_then(Value::as_array).map(|list| {
            list.iter()
                .filter_map(|entry| {
                    Some(Retailer {
                        retailer_name: entry.get("retailer_name")?.as_str()?.to_string(),
                        product_url: entry.get("product_url")?.as_str()?.to_string(),
                    })
                })
                .collect()
        });

        Some(Product {
            id: object.get("id").and_then(Value::as_i64).unwrap_or_default(),
            link: string_field(object.get("link")).unwrap_or_default(),
            title: RenderedText { rendered: title },
            description: string_field(object.get("description")),
            featured_image: string_field(object.get("featured_image")),
            product_categories: object
                .get("product_categories")
                .and_then(Value::as_array)
                .map(|list| strings_of(list.as_slice())),
            retailers,
        })
    }

    pub fn categories(&self) -> &[String] {
        self.product_categories.as_deref().unwrap_or_default()
    }

    pub fn retailers(&self) -> &[Retailer] {
        self.retailers.as_deref().unwrap_or_default()
    }
}

/// Page descriptor returned alongside every product list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub items_per_page: u32,
}

impl Pagination {
    pub fn empty(current_page: u64) -> Self {
        Self {
            current_page,
            total_items: 0,
            total_pages: 0,
            items_per_page: PRODUCTS_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreaturePower {
    #[serde(default, deserialize_with = "lenient::string")]
    pub power: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub used_by: String,
}

/// A full or partial episode. Every field is optional because the episode
/// tool can project results down to a caller-chosen subset of fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(
        rename = "Season",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_number"
    )]
    pub season: Option<i64>,
    #[serde(
        rename = "Episode Number (Broadcast Order)",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_number"
    )]
    pub broadcast_number: Option<i64>,
    #[serde(
        rename = "Episode Number (Internal)",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_number"
    )]
    pub internal_number: Option<i64>,
    #[serde(
        rename = "Episode Title",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub title: Option<String>,
    #[serde(
        rename = "Air Date",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub air_date: Option<String>,
    #[serde(
        rename = "imagePath",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub image_path: Option<String>,
    #[serde(
        rename = "Summary",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub summary: Option<String>,
    #[serde(
        rename = "Animals Featured",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_strings"
    )]
    pub animals_featured: Option<Vec<String>>,
    #[serde(
        rename = "Creature Powers",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_powers"
    )]
    pub creature_powers: Option<Vec<CreaturePower>>,
    #[serde(
        rename = "Locations",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_strings"
    )]
    pub locations: Option<Vec<String>>,
    #[serde(
        rename = "streamingUrls",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_streaming"
    )]
    pub streaming_urls: Option<BTreeMap<String, Option<String>>>,
}

impl Episode {
    /// Composite key used to track expanded summaries: `<season>-<broadcast>`.
    pub fn display_key(&self) -> String {
        fn part(value: Option<i64>) -> String {
            value.map_or_else(|| "?".to_string(), |value| value.to_string())
        }
        format!("{}-{}", part(self.season), part(self.broadcast_number))
    }

    /// Streaming services that actually carry a URL, in name order.
    pub fn streaming_links(&self) -> impl Iterator<Item = (&str, &str)> {
        self.streaming_urls
            .iter()
            .flatten()
            .filter_map(|(name, url)| match url.as_deref() {
                Some(url) if !url.is_empty() => Some((name.as_str(), url)),
                _ => None,
            })
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn strings_of(list: &[Value]) -> Vec<String> {
    list.iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

mod lenient {
    use super::{strings_of, CreaturePower};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::collections::BTreeMap;

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(opt_string(deserializer)?.unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => Some(text),
            _ => None,
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        Ok(opt_number(deserializer)?.unwrap_or_default())
    }

    pub fn opt_number<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64)),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn opt_strings<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<String>>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(list) => Some(strings_of(&list)),
            _ => None,
        })
    }

    pub fn opt_powers<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<CreaturePower>>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(list) => Some(
                list.into_iter()
                    .filter_map(|entry| serde_json::from_value(entry).ok())
                    .collect(),
            ),
            _ => None,
        })
    }

    pub fn opt_streaming<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BTreeMap<String, Option<String>>>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Object(map) => Some(
                map.into_iter()
                    .map(|(name, url)| (name, url.as_str().map(str::to_string)))
                    .collect(),
            ),
            _ => None,
        })
    }
}
