//! The product lookup tool: catalog search and browse.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::upstream::UpstreamClient;
use crate::core::model::{Pagination, Product, PRODUCTS_PER_PAGE};
use crate::utils::text::{contains_ignore_case, strip_html_tags};

/// Cap on accumulated search matches across upstream pages.
pub const MAX_SEARCH_RESULTS: usize = 100;

pub const PRODUCTS_TOOL_DESCRIPTION: &str = "Look up Wild Kratts products. With searchTerm, \
scans the catalog for products whose title or description contains the term (optionally \
narrowed by category) and returns up to 100 matches; in that mode pagination always reports \
page 1 and its totals count only the returned matches, which may understate the true number \
of matches. Without searchTerm, returns one catalog page of 100 products (optionally filtered \
by category) with the catalog's own totals.";

/// Arguments accepted by the product tool, already schema-validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub search_term: Option<String>,
    pub category: Option<String>,
    pub page: u64,
}

impl ProductQuery {
    pub fn from_arguments(arguments: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            arguments
                .get(key)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let page = arguments
            .get("page")
            .and_then(|value| value.as_u64().or_else(|| value.as_f64().map(|page| page as u64)))
            .filter(|page| *page >= 1)
            .unwrap_or(1);

        Self {
            search_term: text("searchTerm"),
            category: text("category"),
            page,
        }
    }
}

/// Tool output. `error` is only present on the failure payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductsPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

impl ProductsPayload {
    fn failed(message: impl std::fmt::Display, current_page: u64) -> Self {
        Self {
            error: Some(format!("Error fetching products: {message}")),
            products: Vec::new(),
            pagination: Pagination::empty(current_page),
        }
    }
}

pub async fn get_products(upstream: &UpstreamClient, query: &ProductQuery) -> ProductsPayload {
    match query.search_term.as_deref() {
        Some(term) => search_products(upstream, term, query.category.as_deref()).await,
        None => browse_products(upstream, query.page, query.category.as_deref()).await,
    }
}

async fn search_products(
    upstream: &UpstreamClient,
    term: &str,
    category: Option<&str>,
) -> ProductsPayload {
    let term = term.to_lowercase();
    let category = category.map(str::to_lowercase);
    let mut matches: Vec<Product> = Vec::new();
    let mut total_pages: u64 = 1;
    let mut page: u64 = 1;

    while page <= total_pages && matches.len() < MAX_SEARCH_RESULTS {
        let fetched = match upstream.fetch_product_page(page, PRODUCTS_PER_PAGE).await {
            Ok(fetched) => fetched,
            Err(err) if page == 1 => return ProductsPayload::failed(err, 1),
            Err(err) => {
                warn!(page, error = %err, "Product search stopped early");
                break;
            }
        };
        if page == 1 {
            total_pages = fetched.total_pages.unwrap_or(1);
        }
        if fetched.records.is_empty() {
            break;
        }

        matches.extend(
            fetched
                .records
                .iter()
                .filter_map(Product::from_upstream)
                .filter(|product| matches_search(product, &term))
                .filter(|product| matches_category(product, category.as_deref())),
        );
        page += 1;
    }

    let total_items = matches.len() as u64;
    debug!(term = %term, total_items, pages_scanned = page - 1, "Product search finished");
    matches.truncate(MAX_SEARCH_RESULTS);

    ProductsPayload {
        error: None,
        products: matches,
        pagination: Pagination {
            current_page: 1,
            total_items,
            total_pages: if total_items == 0 {
                1
            } else {
                total_items.div_ceil(u64::from(PRODUCTS_PER_PAGE))
            },
            items_per_page: PRODUCTS_PER_PAGE,
        },
    }
}

async fn browse_products(
    upstream: &UpstreamClient,
    page: u64,
    category: Option<&str>,
) -> ProductsPayload {
    let fetched = match upstream.fetch_product_page(page, PRODUCTS_PER_PAGE).await {
        Ok(fetched) => fetched,
        Err(err) => return ProductsPayload::failed(err, page),
    };
    let category = category.map(str::to_lowercase);
    let products = fetched
        .records
        .iter()
        .filter_map(Product::from_upstream)
        .filter(|product| matches_category(product, category.as_deref()))
        .collect();

    ProductsPayload {
        error: None,
        products,
        pagination: Pagination {
            current_page: page,
            total_items: fetched.total_items.unwrap_or(0),
            total_pages: fetched.total_pages.unwrap_or(0),
            items_per_page: PRODUCTS_PER_PAGE,
        },
    }
}

fn matches_search(product: &Product, term_lower: &str) -> bool {
    contains_ignore_case(&product.title.rendered, term_lower)
        || product
            .description
            .as_deref()
            .is_some_and(|description| {
                contains_ignore_case(&strip_html_tags(description), term_lower)
            })
}

fn matches_category(product: &Product, category_lower: Option<&str>) -> bool {
    match category_lower {
        None => true,
        Some(category) => product
            .categories()
            .iter()
            .any(|name| contains_ignore_case(name, category)),
    }
}
