//! Model Context Protocol plumbing: the tool server, the in-process link the
//! chat client talks through, the HTTP front, and shared response helpers.

pub mod http;
pub mod link;
pub mod protocol;
pub mod server;
pub mod transport;

pub const VIEW_LOCATION_TOOL: &str = "view_location_google_maps";
pub const SEARCH_MAPS_TOOL: &str = "search_google_maps";
pub const DIRECTIONS_TOOL: &str = "directions_on_google_maps";
pub const PRODUCTS_TOOL: &str = "get-wild-kratts-products";
pub const EPISODES_TOOL: &str = "get-wild-kratts-episodes";

/// Name the tool server reports in its initialize result.
pub const SERVER_NAME: &str = "kratts-tool-server";

pub const JSONRPC_PARSE_ERROR: i64 = -32700;
pub const JSONRPC_INVALID_REQUEST: i64 = -32600;
pub const JSONRPC_METHOD_NOT_FOUND: i64 = -32601;
pub const JSONRPC_INVALID_PARAMS: i64 = -32602;
pub const JSONRPC_INTERNAL_ERROR: i64 = -32603;
