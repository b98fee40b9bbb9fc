pub mod error;
pub mod google;
pub mod openai;
pub mod recall;
pub mod social;

use std::time::Duration;

pub use error::{ClientError, ClientErrorKind};

/// Timeout applied to outbound API calls.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Simple URL-encoding for query parameter values.
pub(crate) fn urlencoded(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

/// Assemble a query string from key/value pairs, encoding the values.
pub(crate) fn build_query(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoded(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencoded() {
        assert_eq!(urlencoded("hello"), "hello");
        assert_eq!(urlencoded("hello world"), "hello%20world");
        assert_eq!(urlencoded("a=b&c=d"), "a%3Db%26c%3Dd");
        assert_eq!(
            urlencoded("https://example.com"),
            "https%3A%2F%2Fexample.com"
        );
    }

    #[test]
    fn test_build_query() {
        assert_eq!(
            build_query(&[("code", "abc def"), ("state", "x")]),
            "code=abc%20def&state=x"
        );
    }
}
