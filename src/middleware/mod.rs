//! Request middleware.

use axum::http::HeaderValue;
use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tag every request with an id so storefront calls can be correlated
/// with gateway calls in the logs. An id supplied by the caller is kept;
/// otherwise one is generated. The id is echoed on the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = match req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
    {
        Some(id) => id.to_string(),
        None => {
            let generated = Uuid::new_v4().to_string();
            if let Ok(value) = HeaderValue::from_str(&generated) {
                req.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            generated
        }
    };

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
