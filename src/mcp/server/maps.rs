//! Map tools. They only hand their arguments to a callback and confirm.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use crate::mcp::{DIRECTIONS_TOOL, SEARCH_MAPS_TOOL, VIEW_LOCATION_TOOL};

/// What a map tool asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapQuery {
    Location { query: String },
    Search { search: String },
    Directions { origin: String, destination: String },
}

/// Receives map requests. Whatever draws the map lives behind this.
pub type MapQueryHandler = Arc<dyn Fn(MapQuery) + Send + Sync>;

pub fn logging_map_handler() -> MapQueryHandler {
    Arc::new(|query| info!(?query, "Map request"))
}

impl MapQuery {
    /// Builds the request for `tool_name` from schema-validated arguments.
    pub fn from_call(tool_name: &str, arguments: &Map<String, Value>) -> Option<Self> {
        let text = |key: &str| arguments.get(key).and_then(Value::as_str).map(str::to_string);
        match tool_name {
            VIEW_LOCATION_TOOL => Some(MapQuery::Location {
                query: text("query")?,
            }),
            SEARCH_MAPS_TOOL => Some(MapQuery::Search {
                search: text("search")?,
            }),
            DIRECTIONS_TOOL => Some(MapQuery::Directions {
                origin: text("origin")?,
                destination: text("destination")?,
            }),
            _ => None,
        }
    }

    pub fn confirmation(&self) -> String {
        match self {
            MapQuery::Location { query } => {
                format!("Information for location: {query} would be processed.")
            }
            MapQuery::Search { search } => {
                format!("Search results for: {search} would be processed.")
            }
            MapQuery::Directions {
                origin,
                destination,
            } => format!("Directions from {origin} to {destination} would be processed."),
        }
    }
}
