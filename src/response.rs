use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Body sent when the client's source address can't be parsed
pub const SERVER_ERROR_BODY: &str = "Server Error! Unable to determine client address";

/// 429 with the canonical reason phrase as body.
///
/// `retry_after_secs` is advertised through the `Retry-After` header.
pub fn too_many_requests(retry_after_secs: u64) -> Response {
    let status = StatusCode::TOO_MANY_REQUESTS;
    let body = status.canonical_reason().unwrap_or("Too Many Requests");

    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}

pub fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_BODY).into_response()
}

/// Whole seconds a client should wait for one token to refill
pub fn retry_after_secs(refill_rate: f64) -> u64 {
    if refill_rate <= 0.0 || !refill_rate.is_finite() {
        return 1;
    }
    (1.0 / refill_rate).ceil().max(1.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_requests() {
        let response = too_many_requests(2);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }

    #[test]
    fn test_retry_after_secs() {
        assert_eq!(retry_after_secs(1.0), 1);
        assert_eq!(retry_after_secs(0.25), 4);
        assert_eq!(retry_after_secs(10.0), 1);
        assert_eq!(retry_after_secs(0.0), 1);
    }
}
