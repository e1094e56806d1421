//! Enhancement endpoint.
//!
//! `POST /api/enhance` with multipart fields `image` (binary, required)
//! and `scale` (string integer, optional, default "2"). Responds with the
//! enhanced PNG bytes, or the fixed JSON error bodies on failure.

use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use ugc_media::MediaError;
use ugc_models::{resolve_scale, EnhancementParameters};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Handle one enhancement request: a single deterministic attempt, no
/// retries, nothing persisted beyond the response.
pub async fn enhance_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut image_bytes: Option<Vec<u8>> = None;
    let mut scale_raw: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            // A bare text part named "image" is not an upload
            Some("image") if field.file_name().is_some() => {
                image_bytes = Some(field.bytes().await?.to_vec());
            }
            Some("scale") => {
                scale_raw = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let image = image_bytes.ok_or(ApiError::NoImage)?;
    let scale = resolve_scale(scale_raw.as_deref());

    let (width, height) = ugc_media::read_dimensions(&image)?;
    let params = EnhancementParameters::compute(width, height, scale).map_err(MediaError::from)?;
    debug!(width, height, %scale, "Enhancement request accepted");

    let enhancer = state.enhancer.clone();
    let png = tokio::task::spawn_blocking(move || enhancer.enhance(&image, &params))
        .await
        .map_err(|e| MediaError::internal(format!("enhance task panicked: {}", e)))??;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use std::io::Cursor;
    use tower::ServiceExt;

    use crate::config::ApiConfig;
    use crate::routes::create_router;
    use crate::state::AppState;

    const BOUNDARY: &str = "ugc-test-boundary";

    fn test_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 100, 50]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn multipart_body(image: Option<&[u8]>, scale: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(bytes) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; \
                     filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(scale) = scale {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"scale\"\r\n\r\n")
                    .as_bytes(),
            );
            body.extend_from_slice(scale.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn enhance_request(image: Option<&[u8]>, scale: Option<&str>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/enhance")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(image, scale)))
            .unwrap()
    }

    fn app() -> axum::Router {
        create_router(AppState::new(ApiConfig::default()), None)
    }

    #[tokio::test]
    async fn test_enhance_returns_png_with_no_store() {
        let png = test_png(10, 8);
        let response = app().oneshot(enhance_request(Some(&png), Some("2"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let decoded = image::load_from_memory(&body).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 16));
    }

    #[tokio::test]
    async fn test_enhance_defaults_scale_to_two() {
        let png = test_png(6, 4);
        let response = app().oneshot(enhance_request(Some(&png), None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let decoded = image::load_from_memory(&body).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 8));
    }

    #[tokio::test]
    async fn test_missing_image_is_bad_request() {
        let response = app().oneshot(enhance_request(None, Some("2"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "No image"}));
    }

    #[tokio::test]
    async fn test_corrupt_image_is_processing_failure() {
        let response = app()
            .oneshot(enhance_request(Some(b"definitely not an image"), Some("2")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Processing failed"}));
    }

    #[tokio::test]
    async fn test_out_of_range_scale_is_clamped_not_rejected() {
        let png = test_png(3, 3);
        let response = app().oneshot(enhance_request(Some(&png), Some("99"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let decoded = image::load_from_memory(&body).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 12));
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
