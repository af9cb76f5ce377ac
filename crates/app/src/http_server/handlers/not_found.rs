use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;

use crate::http_server::StaticAssets;

pub async fn not_found_handler(headers: HeaderMap) -> Response {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok());

    match accept {
        Some(accept_str) if accept_str.contains("application/json") => {
            let err_msg = serde_json::json!({"msg": "not found"});
            (StatusCode::NOT_FOUND, Json(err_msg)).into_response()
        }
        Some(accept_str) if accept_str.contains("text/html") => match StaticAssets::get("404.html")
        {
            Some(page) => (
                StatusCode::NOT_FOUND,
                Html(String::from_utf8_lossy(&page.data).into_owned()),
            )
                .into_response(),
            None => plain_not_found(),
        },
        _ => plain_not_found(),
    }
}

fn plain_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        "not found",
    )
        .into_response()
}
