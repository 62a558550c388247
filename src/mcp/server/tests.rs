use super::maps::{logging_map_handler, MapQuery};
use super::upstream::UpstreamClient;
use super::ToolServer;
use crate::mcp::{DIRECTIONS_TOOL, EPISODES_TOOL, PRODUCTS_TOOL};
use crate::utils::test_utils::{MockHttpServer, MockResponse};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

fn raw_product(id: i64, title: &str, categories: &[&str]) -> Value {
    json!({
        "id": id,
        "link": format!("https://shop.test/p/{id}"),
        "title": {"rendered": title},
        "description": "<p>Official merchandise</p>",
        "product_categories": categories,
        "status": "publish"
    })
}

fn server_for(base_url: &str) -> ToolServer {
    let upstream = UpstreamClient::new(base_url.to_string(), base_url.to_string())
        .expect("client should build");
    ToolServer::new(upstream, logging_map_handler()).expect("server should build")
}

fn arguments(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("arguments should be an object")
}

async fn call_json(server: &ToolServer, tool: &str, args: Value) -> Value {
    let text = server
        .call_tool(tool, arguments(args))
        .await
        .expect("tool call should succeed");
    serde_json::from_str(&text).expect("tool output should be JSON")
}

#[tokio::test]
async fn search_mode_scans_pages_and_reports_accumulated_totals() {
    let upstream = MockHttpServer::spawn(|request| match request.path_and_query() {
        "/products?per_page=100&page=1" => MockResponse::json(json!([
            raw_product(1, "Creature Power Suit", &["Wear"]),
            raw_product(2, "Tortuga Playset", &["Play"]),
        ]))
        .with_header("X-WP-Total", "3")
        .with_header("X-WP-TotalPages", "2"),
        "/products?per_page=100&page=2" => MockResponse::json(json!([
            raw_product(3, "Creature Power Disc", &["Play"]),
        ])),
        _ => MockResponse::status(404, "missing"),
    })
    .await;
    let server = server_for(&upstream.base_url);

    let output = call_json(&server, PRODUCTS_TOOL, json!({"searchTerm": "POWER", "page": 7})).await;

    let ids: Vec<i64> = output["products"]
        .as_array()
        .expect("products array")
        .iter()
        .filter_map(|product| product["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(
        output["pagination"],
        json!({"currentPage": 1, "totalItems": 2, "totalPages": 1, "itemsPerPage": 100})
    );
    assert!(output.get("error").is_none());
    assert!(output["products"][0].get("status").is_none());
    assert_eq!(
        upstream.paths().await,
        vec![
            "/products?per_page=100&page=1".to_string(),
            "/products?per_page=100&page=2".to_string()
        ]
    );
}

#[tokio::test]
async fn search_mode_keeps_partial_results_when_a_later_page_fails() {
    let upstream = MockHttpServer::spawn(|request| match request.path_and_query() {
        "/products?per_page=100&page=1" => {
            MockResponse::json(json!([raw_product(1, "Croc Plush", &["Play"])]))
                .with_header("X-WP-TotalPages", "3")
        }
        _ => MockResponse::status(502, "bad gateway"),
    })
    .await;
    let server = server_for(&upstream.base_url);

    let output = call_json(&server, PRODUCTS_TOOL, json!({"searchTerm": "croc"})).await;

    assert!(output.get("error").is_none());
    assert_eq!(output["products"].as_array().map(Vec::len), Some(1));
    assert_eq!(output["pagination"]["totalItems"], json!(1));
    assert_eq!(upstream.paths().await.len(), 2);
}

#[tokio::test]
async fn upstream_500_becomes_error_payload() {
    let upstream = MockHttpServer::spawn(|_| MockResponse::status(500, "boom")).await;
    let server = server_for(&upstream.base_url);

    for args in [json!({"searchTerm": "suit"}), json!({})] {
        let output = call_json(&server, PRODUCTS_TOOL, args).await;
        let error = output["error"].as_str().expect("error message");
        assert!(error.starts_with("Error fetching products: "));
        assert!(error.contains("500"));
        assert_eq!(output["products"], json!([]));
        assert_eq!(
            output["pagination"],
            json!({"currentPage": 1, "totalItems": 0, "totalPages": 0, "itemsPerPage": 100})
        );
    }
}

#[tokio::test]
async fn browse_mode_passes_through_page_and_header_totals() {
    let upstream = MockHttpServer::spawn(|request| match request.path_and_query() {
        "/products?per_page=100&page=2" => MockResponse::json(json!([
            raw_product(5, "Hoodie", &["Wear"]),
            raw_product(6, "Puzzle", &["Play"]),
        ]))
        .with_header("X-WP-Total", "150")
        .with_header("X-WP-TotalPages", "2"),
        _ => MockResponse::status(404, "missing"),
    })
    .await;
    let server = server_for(&upstream.base_url);

    let output = call_json(&server, PRODUCTS_TOOL, json!({"page": 2, "category": "wear"})).await;

    assert_eq!(output["products"].as_array().map(Vec::len), Some(1));
    assert_eq!(output["products"][0]["title"]["rendered"], json!("Hoodie"));
    assert_eq!(
        output["pagination"],
        json!({"currentPage": 2, "totalItems": 150, "totalPages": 2, "itemsPerPage": 100})
    );
}

#[tokio::test]
async fn search_mode_stops_once_the_result_cap_is_reached() {
    let upstream = MockHttpServer::spawn(|request| match request.path_and_query() {
        "/products?per_page=100&page=1" => {
            let records: Vec<Value> = (1..=120)
                .map(|id| raw_product(id, &format!("Tortuga Poster {id}"), &["Decor"]))
                .collect();
            MockResponse::json(Value::Array(records))
                .with_header("X-WP-Total", "300")
                .with_header("X-WP-TotalPages", "3")
        }
        _ => MockResponse::json(json!([raw_product(999, "Tortuga Mug", &["Decor"])])),
    })
    .await;
    let server = server_for(&upstream.base_url);

    let output = call_json(&server, PRODUCTS_TOOL, json!({"searchTerm": "tortuga"})).await;

    let products = output["products"].as_array().expect("products array");
    assert_eq!(products.len(), 100);
    assert_eq!(products[99]["id"], json!(100));
    assert_eq!(
        output["pagination"],
        json!({"currentPage": 1, "totalItems": 120, "totalPages": 2, "itemsPerPage": 100})
    );
    assert_eq!(
        upstream.paths().await,
        vec!["/products?per_page=100&page=1".to_string()]
    );
}

#[tokio::test]
async fn browse_mode_reports_large_page_numbers_unchanged() {
    let upstream = MockHttpServer::spawn(|_| {
        MockResponse::json(json!([]))
            .with_header("X-WP-Total", "150")
            .with_header("X-WP-TotalPages", "2")
    })
    .await;
    let server = server_for(&upstream.base_url);

    let output = call_json(&server, PRODUCTS_TOOL, json!({"page": 5_000_000_000u64})).await;

    assert_eq!(output["pagination"]["currentPage"], json!(5_000_000_000u64));
    assert_eq!(output["products"], json!([]));
    assert_eq!(
        upstream.paths().await,
        vec!["/products?per_page=100&page=5000000000".to_string()]
    );
}

#[tokio::test]
async fn episode_tool_filters_and_projects() {
    let upstream = MockHttpServer::spawn(|request| match request.path_and_query() {
        "/episodes" => MockResponse::json(json!([
            {"Season": 1, "Episode Title": "Mom of a Croc", "Animals Featured": ["Nile Crocodile"]},
            {"Season": 2, "Episode Title": "Croc Saves Baby", "Animals Featured": ["Crocodile"]},
        ])),
        _ => MockResponse::status(404, "missing"),
    })
    .await;
    let server = server_for(&upstream.base_url);

    let output = call_json(
        &server,
        EPISODES_TOOL,
        json!({"seasonNumber": 2, "fields": ["Episode Title"]}),
    )
    .await;
    assert_eq!(output, json!([{"Episode Title": "Croc Saves Baby"}]));

    let first = call_json(&server, EPISODES_TOOL, json!({})).await;
    let second = call_json(&server, EPISODES_TOOL, json!({})).await;
    assert_eq!(first, second);
    assert_eq!(first.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn episode_fetch_failure_is_a_bare_error_object() {
    let upstream = MockHttpServer::spawn(|_| MockResponse::status(503, "down")).await;
    let server = server_for(&upstream.base_url);

    let output = call_json(&server, EPISODES_TOOL, json!({})).await;

    assert_eq!(
        output,
        json!({"error": "Error fetching episodes: API request failed with status 503"})
    );
}

#[tokio::test]
async fn invalid_arguments_are_rejected_before_the_tool_runs() {
    let upstream = MockHttpServer::spawn(|_| MockResponse::json(json!([]))).await;
    let seen: Arc<Mutex<Vec<MapQuery>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let server = ToolServer::new(
        UpstreamClient::new(upstream.base_url.clone(), upstream.base_url.clone())
            .expect("client should build"),
        Arc::new(move |query| recorder.lock().expect("lock").push(query)),
    )
    .expect("server should build");

    let err = server
        .call_tool(DIRECTIONS_TOOL, arguments(json!({"origin": "Boston"})))
        .await
        .expect_err("missing destination should fail");
    assert_eq!(err.code, -32602);
    assert!(seen.lock().expect("lock").is_empty());

    let err = server
        .call_tool(PRODUCTS_TOOL, arguments(json!({"page": 0})))
        .await
        .expect_err("page 0 should fail");
    assert_eq!(err.code, -32602);
    assert!(upstream.paths().await.is_empty());

    let text = server
        .call_tool(
            DIRECTIONS_TOOL,
            arguments(json!({"origin": "Boston", "destination": "Montreal"})),
        )
        .await
        .expect("valid call");
    assert_eq!(text, "Directions from Boston to Montreal would be processed.");
    assert_eq!(
        *seen.lock().expect("lock"),
        vec![MapQuery::Directions {
            origin: "Boston".to_string(),
            destination: "Montreal".to_string()
        }]
    );
}

#[tokio::test]
async fn json_rpc_envelope_handles_errors_and_notifications() {
    let server = server_for("http://127.0.0.1:9");

    let parse = server.handle_line("{not json").await.expect("reply");
    assert_eq!(parse["error"]["code"], json!(-32700));
    assert_eq!(parse["id"], Value::Null);

    let unknown = server
        .handle_line(r#"{"jsonrpc":"2.0","id":"a","method":"resources/list"}"#)
        .await
        .expect("reply");
    assert_eq!(unknown["id"], json!("a"));
    assert_eq!(unknown["error"]["code"], json!(-32601));
    assert_eq!(
        unknown["error"]["message"],
        json!("Method not found: resources/list")
    );

    assert!(server
        .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await
        .is_none());

    let unknown_tool = server
        .handle_line(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
        )
        .await
        .expect("reply");
    assert_eq!(unknown_tool["error"]["code"], json!(-32602));

    let listed = server
        .handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"tools/list"}"#)
        .await
        .expect("reply");
    let names: Vec<&str> = listed["result"]["tools"]
        .as_array()
        .expect("tools")
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "view_location_google_maps",
            "search_google_maps",
            "directions_on_google_maps",
            "get-wild-kratts-products",
            "get-wild-kratts-episodes"
        ]
    );
}

#[tokio::test]
async fn map_tool_call_returns_text_content() {
    let server = server_for("http://127.0.0.1:9");
    let reply = server
        .handle_line(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"search_google_maps","arguments":{"search":"otters"}}}"#,
        )
        .await
        .expect("reply");

    assert_eq!(
        reply["result"],
        json!({"content": [{"type": "text", "text": "Search results for: otters would be processed."}]})
    );
}
