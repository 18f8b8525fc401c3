use axum::{
    body::Body,
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};

/// Answers every `OPTIONS` request with `204 No Content`.
///
/// Must sit outside the CORS layer: the inner stack still runs so the CORS
/// headers it produces are kept, only the status and body are replaced.
pub async fn preflight_middleware(req: Request, next: Next) -> Response {
    if req.method() != Method::OPTIONS {
        return next.run(req).await;
    }

    let inner = next.run(req).await;
    let (mut parts, _) = inner.into_parts();
    parts.status = StatusCode::NO_CONTENT;
    parts.headers.remove(axum::http::header::CONTENT_TYPE);
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware::from_fn, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/chat", get(|| async { "hello" }))
            .layer(from_fn(preflight_middleware))
    }

    #[tokio::test]
    async fn options_on_any_path_is_no_content() {
        for path in ["/chat", "/unknown"] {
            let res = app()
                .oneshot(
                    Request::builder()
                        .method(Method::OPTIONS)
                        .uri(path)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::NO_CONTENT);
        }
    }

    #[tokio::test]
    async fn other_methods_pass_through() {
        let res = app()
            .oneshot(Request::builder().uri("/chat").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
