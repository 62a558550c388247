//! Tagged parsing of tool-result text.
//!
//! Tool results arrive as JSON text whose shape depends on the tool and on
//! whether the upstream fetch worked. Each parser collapses that into a
//! [`ToolPayload`], so callers branch exhaustively instead of sniffing fields.

use serde_json::Value;

use crate::core::model::{Episode, Pagination, Product};

#[derive(Debug, Clone, PartialEq)]
pub enum ToolPayload<T> {
    /// The payload carried the expected data.
    Ok(T),
    /// The payload was an object with an `error` string.
    Error(String),
    /// Anything else: unparseable text, unexpected shape, missing content.
    Malformed,
}

/// Product list plus its pagination descriptor, when one was sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Option<Pagination>,
}

/// Parses a product tool result. A `products` array wins over an `error`
/// field, so the tool's own failure payload (which carries an empty
/// `products` array) lands in the `Ok` branch with no products.
pub fn parse_product_payload(text: Option<&str>) -> ToolPayload<ProductPage> {
    let Some(value) = parse_json(text) else {
        return ToolPayload::Malformed;
    };

    if let Some(products) = value.get("products").and_then(Value::as_array) {
        let products: Result<Vec<Product>, _> = products
            .iter()
            .cloned()
            .map(serde_json::from_value::<Product>)
            .collect();
        return match products {
            Ok(products) => ToolPayload::Ok(ProductPage {
                products,
                pagination: value
                    .get("pagination")
                    .cloned()
                    .and_then(|pagination| serde_json::from_value(pagination).ok()),
            }),
            Err(_) => ToolPayload::Malformed,
        };
    }

    error_or_malformed(&value)
}

/// Parses an episode tool result: an array of (possibly partial) episodes,
/// or an object with an `error` string.
pub fn parse_episode_payload(text: Option<&str>) -> ToolPayload<Vec<Episode>> {
    let Some(value) = parse_json(text) else {
        return ToolPayload::Malformed;
    };

    if value.is_array() {
        return match serde_json::from_value::<Vec<Episode>>(value) {
            Ok(episodes) => ToolPayload::Ok(episodes),
            Err(_) => ToolPayload::Malformed,
        };
    }

    error_or_malformed(&value)
}

fn parse_json(text: Option<&str>) -> Option<Value> {
    serde_json::from_str::<Value>(text?).ok()
}

fn error_or_malformed<T>(value: &Value) -> ToolPayload<T> {
    match value.get("error").and_then(Value::as_str) {
        Some(message) => ToolPayload::Error(message.to_string()),
        None => ToolPayload::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_payload_with_products_parses_pagination() {
        let text = r#"{"products":[{"id":1,"link":"l","title":{"rendered":"Plush"}}],
            "pagination":{"currentPage":2,"totalItems":150,"totalPages":2,"itemsPerPage":100}}"#;

        let ToolPayload::Ok(page) = parse_product_payload(Some(text)) else {
            panic!("expected products");
        };
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.products[0].title.rendered, "Plush");
        assert_eq!(page.pagination.map(|p| p.current_page), Some(2));
    }

    #[test]
    fn odd_product_ids_do_not_sink_the_page() {
        let text = r#"{"products":[
            {"id":"17","title":{"rendered":"Tee"}},
            {"id":"sku-9","title":{"rendered":"Mug"}},
            {"id":null,"title":{"rendered":"Cap"}},
            {"id":4.0,"title":{"rendered":"Hat"}}]}"#;

        let ToolPayload::Ok(page) = parse_product_payload(Some(text)) else {
            panic!("expected products");
        };
        let ids: Vec<i64> = page.products.iter().map(|product| product.id).collect();
        assert_eq!(ids, vec![17, 0, 0, 4]);
        assert_eq!(page.products[1].title.rendered, "Mug");
    }

    #[test]
    fn product_error_payload_prefers_products_array() {
        let text = r#"{"error":"Error fetching products: boom","products":[],
            "pagination":{"currentPage":1,"totalItems":0,"totalPages":0,"itemsPerPage":100}}"#;

        match parse_product_payload(Some(text)) {
            ToolPayload::Ok(page) => assert!(page.products.is_empty()),
            other => panic!("expected empty products, got {other:?}"),
        }
    }

    #[test]
    fn bare_error_object_is_an_error() {
        assert_eq!(
            parse_product_payload(Some(r#"{"error":"nope"}"#)),
            ToolPayload::Error("nope".to_string())
        );
        assert_eq!(
            parse_episode_payload(Some(r#"{"error":"Error fetching episodes: down"}"#)),
            ToolPayload::Error("Error fetching episodes: down".to_string())
        );
    }

    #[test]
    fn unexpected_shapes_are_malformed() {
        assert_eq!(parse_product_payload(None), ToolPayload::Malformed);
        assert_eq!(parse_product_payload(Some("not json")), ToolPayload::Malformed);
        assert_eq!(parse_product_payload(Some("[]")), ToolPayload::Malformed);
        assert_eq!(
            parse_product_payload(Some(r#"{"products":[1,2]}"#)),
            ToolPayload::Malformed
        );
        assert_eq!(parse_episode_payload(Some(r#"{"episodes":[]}"#)), ToolPayload::Malformed);
        assert_eq!(parse_episode_payload(Some(r#"{"error":42}"#)), ToolPayload::Malformed);
    }

    #[test]
    fn episode_payload_accepts_partial_objects() {
        let text = r#"[{"Episode Title":"Mom of a Croc"},{"Season":1,"Summary":"Crocs!"}]"#;
        let ToolPayload::Ok(episodes) = parse_episode_payload(Some(text)) else {
            panic!("expected episodes");
        };
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].title.as_deref(), Some("Mom of a Croc"));
        assert_eq!(episodes[1].season, Some(1));
    }
}
