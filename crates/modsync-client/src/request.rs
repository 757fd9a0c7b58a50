//! Outgoing request description and its cache identity.

use reqwest::{Method, Url};

/// A request to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: Url,
}

impl ApiRequest {
    /// Create a request.
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Whether the response may be cached and shared between callers.
    pub fn is_shareable(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// Cache and coalescing key: method plus the URL with query pairs
    /// sorted and the fragment dropped.
    pub fn identity(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if pairs.is_empty() {
            url.set_query(None);
        } else {
            pairs.sort();
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }

        format!("{} {}", self.method, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_identity_ignores_query_order_and_fragment() {
        let a = ApiRequest::get(url("https://catalog.test/v1/projects?b=2&a=1#top"));
        let b = ApiRequest::get(url("https://catalog.test/v1/projects?a=1&b=2"));
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.identity(), "GET https://catalog.test/v1/projects?a=1&b=2");
    }

    #[test]
    fn test_identity_distinguishes_method_and_path() {
        let get = ApiRequest::get(url("https://catalog.test/v1/projects/1"));
        let head = ApiRequest::new(Method::HEAD, url("https://catalog.test/v1/projects/1"));
        let other = ApiRequest::get(url("https://catalog.test/v1/projects/2"));
        assert_ne!(get.identity(), head.identity());
        assert_ne!(get.identity(), other.identity());
    }

    #[test]
    fn test_only_safe_methods_are_shareable() {
        let target = url("https://catalog.test/v1/projects");
        assert!(ApiRequest::get(target.clone()).is_shareable());
        assert!(ApiRequest::new(Method::HEAD, target.clone()).is_shareable());
        assert!(!ApiRequest::new(Method::POST, target).is_shareable());
    }
}
