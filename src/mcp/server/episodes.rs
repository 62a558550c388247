//! The episode lookup tool.

use serde_json::{json, Map, Value};
use tracing::debug;

use super::upstream::UpstreamClient;
use crate::core::model::VALID_EPISODE_FIELDS;
use crate::utils::text::contains_ignore_case;

pub const EPISODES_TOOL_DESCRIPTION: &str = "Look up Wild Kratts episodes. Filters combine: \
seasonNumber must match exactly, episodeTitle is a case-insensitive substring of the title, \
and every name in animalsFeatured must appear in the episode's featured animals. Use fields \
to return only some episode fields.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeQuery {
    pub season_number: Option<f64>,
    pub episode_title: Option<String>,
    pub animals_featured: Vec<String>,
    pub fields: Option<Vec<String>>,
}

impl EpisodeQuery {
    pub fn from_arguments(arguments: &Map<String, Value>) -> Self {
        let strings = |key: &str| {
            arguments.get(key).and_then(Value::as_array).map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
        };

        Self {
            season_number: arguments.get("seasonNumber").and_then(Value::as_f64),
            episode_title: arguments
                .get("episodeTitle")
                .and_then(Value::as_str)
                .filter(|title| !title.is_empty())
                .map(str::to_string),
            animals_featured: strings("animalsFeatured").unwrap_or_default(),
            fields: strings("fields").filter(|fields| !fields.is_empty()),
        }
    }
}

/// Fetches the episode list and applies the query. Returns the JSON the tool
/// emits: an array of episodes, or `{error}` when the fetch failed.
pub async fn get_episodes(upstream: &UpstreamClient, query: &EpisodeQuery) -> Value {
    match upstream.fetch_episodes().await {
        Ok(episodes) => {
            let total = episodes.len();
            let matched = filter_episodes(episodes, query);
            debug!(total, matched = matched.len(), "Episode lookup finished");
            Value::Array(project_fields(matched, query.fields.as_deref()))
        }
        Err(err) => json!({ "error": format!("Error fetching episodes: {err}") }),
    }
}

/// Applies season, title, then featured-animal filters, in that order.
/// Non-object records never match.
pub fn filter_episodes(episodes: Vec<Value>, query: &EpisodeQuery) -> Vec<Value> {
    let title = query.episode_title.as_deref().map(str::to_lowercase);
    let animals: Vec<String> = query
        .animals_featured
        .iter()
        .map(|animal| animal.to_lowercase())
        .collect();

    episodes
        .into_iter()
        .filter(Value::is_object)
        .filter(|episode| match query.season_number {
            None => true,
            Some(season) => episode.get("Season").and_then(Value::as_f64) == Some(season),
        })
        .filter(|episode| match title.as_deref() {
            None => true,
            Some(title) => episode
                .get("Episode Title")
                .and_then(Value::as_str)
                .is_some_and(|candidate| contains_ignore_case(candidate, title)),
        })
        .filter(|episode| animals.is_empty() || features_all(episode, &animals))
        .collect()
}

fn features_all(episode: &Value, wanted_lower: &[String]) -> bool {
    let featured: Vec<String> = episode
        .get("Animals Featured")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_lowercase)
                .collect()
        })
        .unwrap_or_default();

    wanted_lower
        .iter()
        .all(|wanted| featured.iter().any(|name| name.contains(wanted.as_str())))
}

/// Keeps only allow-listed requested fields. When none of the requested
/// names is allowed, episodes are returned whole.
pub fn project_fields(episodes: Vec<Value>, fields: Option<&[String]>) -> Vec<Value> {
    let Some(fields) = fields else {
        return episodes;
    };
    let allowed: Vec<&str> = fields
        .iter()
        .map(String::as_str)
        .filter(|field| VALID_EPISODE_FIELDS.contains(field))
        .collect();
    if allowed.is_empty() {
        return episodes;
    }

    episodes
        .into_iter()
        .map(|episode| match episode {
            Value::Object(mut full) => {
                let partial: Map<String, Value> = allowed
                    .iter()
                    .filter_map(|field| full.remove(*field).map(|value| (field.to_string(), value)))
                    .collect();
                Value::Object(partial)
            }
            other => other,
        })
        .collect()
}
