//! URL utilities for consistent endpoint construction
//!
//! Base URLs arrive from user configuration with or without trailing slashes;
//! these helpers normalize them so appended endpoints never produce double
//! slashes.

/// Normalize a base URL by removing trailing slashes.
///
/// # Examples
///
/// ```
/// use chatbridge::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.example.com/v1"), "https://api.example.com/v1");
/// assert_eq!(normalize_base_url("https://api.example.com/v1/"), "https://api.example.com/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete endpoint URL from a base URL and endpoint path.
///
/// # Examples
///
/// ```
/// use chatbridge::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.example.com/", "/verify"),
///     "https://api.example.com/verify"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_any_number_of_trailing_slashes() {
        assert_eq!(
            normalize_base_url("https://api.example.com/v1///"),
            "https://api.example.com/v1"
        );
        assert_eq!(normalize_base_url("https://api.example.com"), "https://api.example.com");
        assert_eq!(normalize_base_url(""), "");
    }

    #[test]
    fn construct_handles_slash_combinations() {
        for base in ["https://api.example.com", "https://api.example.com/"] {
            for endpoint in ["session", "/session"] {
                assert_eq!(
                    construct_api_url(base, endpoint),
                    "https://api.example.com/session"
                );
            }
        }
    }
}
