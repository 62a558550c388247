//! URL helpers for the chat API and the catalog endpoints.
//!
//! Base URLs come from configuration and environment variables, so they may
//! or may not carry trailing slashes. Everything here joins paths without
//! producing `//`.

/// Join a base URL and an endpoint path with exactly one slash between them.
///
/// # Examples
///
/// ```
/// use kratts_assistant::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.example.com/v1/", "/chat/completions"),
///     "https://api.example.com/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{base}/{endpoint}")
}

/// Join and validate, so a bad configured base URL is reported once with the
/// offending value instead of failing later inside a request.
pub fn endpoint_url(base_url: &str, endpoint: &str) -> Result<reqwest::Url, String> {
    let joined = construct_api_url(base_url, endpoint);
    reqwest::Url::parse(&joined).map_err(|err| format!("Invalid URL {joined}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_catalog_endpoints() {
        assert_eq!(
            construct_api_url("https://wildkratts.com/wp-json/wp/v2", "products"),
            "https://wildkratts.com/wp-json/wp/v2/products"
        );
        assert_eq!(
            construct_api_url("https://wildkratts.com/wp-json/wild-kratts/v1///", "episodes"),
            "https://wildkratts.com/wp-json/wild-kratts/v1/episodes"
        );
    }

    #[test]
    fn endpoint_url_rejects_garbage() {
        assert!(endpoint_url("not a url", "products").is_err());
        let url = endpoint_url("http://127.0.0.1:9000/", "episodes").expect("valid url");
        assert_eq!(url.path(), "/episodes");
    }
}
