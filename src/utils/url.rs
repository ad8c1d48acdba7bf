//! Endpoint construction for the agent and session-store URLs.

/// Strips trailing slashes so endpoints can be appended with a single `/`.
///
/// ```
/// use agentdeck::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/api/"), "http://localhost:8000/api");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Joins a base URL and a relative endpoint path.
///
/// ```
/// use agentdeck::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/api/", "/agent/chat"),
///     "http://localhost:8000/api/agent/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{endpoint}", normalize_base_url(base_url))
}
