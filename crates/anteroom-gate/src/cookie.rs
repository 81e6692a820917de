//! Session cookie parsing.

use axum::http::HeaderMap;
use axum::http::header;

/// Name of the session cookie carrying the admission token.
pub const AUTH_COOKIE: &str = "authToken";

/// Extract the admission token from a request's Cookie header.
///
/// Returns `None` for a missing header, a header that isn't valid
/// UTF-8, or a cookie list without a non-empty `authToken` — all of
/// which the waiting room treats as "not yet admitted", never as an
/// error.
pub fn auth_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == AUTH_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// Render the Set-Cookie value binding a visitor to their token.
pub fn set_cookie_value(token: &str) -> String {
    format!("{AUTH_COOKIE}={token}; SameSite=None; Secure")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_token() {
        let headers = headers_with_cookie("authToken=abc123");
        assert_eq!(auth_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extracts_token_among_other_cookies() {
        let headers =
            headers_with_cookie("theme=dark; authToken=abc123; session=xyz");
        assert_eq!(auth_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn missing_header_is_none() {
        assert_eq!(auth_token(&HeaderMap::new()), None);
    }

    #[test]
    fn other_cookies_only_is_none() {
        let headers = headers_with_cookie("theme=dark; session=xyz");
        assert_eq!(auth_token(&headers), None);
    }

    #[test]
    fn empty_value_is_none() {
        let headers = headers_with_cookie("authToken=");
        assert_eq!(auth_token(&headers), None);
    }

    #[test]
    fn set_cookie_shape() {
        assert_eq!(
            set_cookie_value("abc"),
            "authToken=abc; SameSite=None; Secure"
        );
    }
}
