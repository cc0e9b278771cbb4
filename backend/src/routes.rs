use actix_web::{web, HttpResponse};
use futures::StreamExt;
use log::{error, info, warn};
use shared::{
    ERROR_KIND_HEADER, ErrorKind, ErrorResponse, HealthResponse, PredictResponse,
    PredictionResult, REQUEST_ID_HEADER,
};
use uuid::Uuid;

use crate::inference::{NormalizeError, PredictionError, PredictionService};

/// Transport settings shared by the handlers.
#[derive(Clone, Debug)]
pub struct RouteConfig {
    pub payload_limit: usize,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(health)))
        .service(web::resource("/predict").route(web::post().to(predict)));
}

async fn health() -> HttpResponse {
    // The service cannot be running without a loaded artifact.
    HttpResponse::Ok().json(HealthResponse::ok())
}

/// Collects the raw body up to `limit` bytes. Content-Type is not checked.
async fn read_body(mut payload: web::Payload, limit: usize) -> Result<Vec<u8>, NormalizeError> {
    let mut body = Vec::new();
    while let Some(chunk) = payload.next().await {
        let data = chunk.map_err(|e| NormalizeError::Payload(e.to_string()))?;
        if body.len() + data.len() > limit {
            return Err(NormalizeError::PayloadTooLarge(limit));
        }
        body.extend_from_slice(&data);
    }
    Ok(body)
}

async fn predict(
    service: web::Data<PredictionService>,
    route_config: web::Data<RouteConfig>,
    payload: web::Payload,
) -> HttpResponse {
    let request_id = Uuid::new_v4();

    let outcome = match read_body(payload, route_config.payload_limit).await {
        Ok(body) => service.predict_body(&body),
        Err(e) => Err(PredictionError::from(e)),
    };

    match outcome {
        Ok(predictions) => {
            for prediction in &predictions {
                info!(
                    "[{}] Predicted '{}' with confidence {:.4}",
                    request_id, prediction.label, prediction.confidence
                );
            }
            let results: Vec<PredictionResult> =
                predictions.into_iter().map(PredictionResult::from).collect();
            HttpResponse::Ok()
                .insert_header((REQUEST_ID_HEADER, request_id.to_string()))
                .json(PredictResponse { results })
        }
        Err(e) => {
            let kind = e.kind();
            match kind {
                ErrorKind::Validation => warn!("[{}] Rejected payload: {}", request_id, e),
                ErrorKind::Inference => error!("[{}] Model inference error: {}", request_id, e),
            }
            HttpResponse::BadRequest()
                .insert_header((REQUEST_ID_HEADER, request_id.to_string()))
                .insert_header((ERROR_KIND_HEADER, kind.as_ref()))
                .json(ErrorResponse {
                    error: e.to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::test_support;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::json;

    macro_rules! app {
        ($limit:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(PredictionService::new(test_support::bundle())))
                    .app_data(web::Data::new(RouteConfig {
                        payload_limit: $limit,
                    }))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn health_reports_loaded_model() {
        let app = app!(1024);
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: HealthResponse = test::read_body_json(resp).await;
        assert_eq!(body, HealthResponse::ok());
        assert!(body.model_loaded);
        assert_eq!(body.service, "Symptom Tracker");
    }

    #[actix_web::test]
    async fn predict_returns_one_result() {
        let app = app!(1024);
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "chest_pain": 1, "cough": 0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(REQUEST_ID_HEADER));

        let body: PredictResponse = test::read_body_json(resp).await;
        assert_eq!(body.results.len(), 1);
        assert_eq!(body.results[0].disease, "Heart attack");
        assert!((0.0..=1.0).contains(&body.results[0].probability));
    }

    #[actix_web::test]
    async fn predict_ignores_content_type() {
        let app = app!(1024);
        let req = test::TestRequest::post()
            .uri("/predict")
            .insert_header(("content-type", "text/plain"))
            .set_payload(r#"{"vomiting": 1}"#)
            .to_request();
        let body: PredictResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.results[0].disease, "Typhoid");
    }

    #[actix_web::test]
    async fn repeated_calls_are_identical() {
        let app = app!(1024);
        let mut seen = Vec::new();
        for _ in 0..3 {
            let req = test::TestRequest::post()
                .uri("/predict")
                .set_json(json!({ "cough": 1, "high_fever": 1, "sneezing": 1 }))
                .to_request();
            let body: PredictResponse = test::call_and_read_body_json(&app, req).await;
            seen.push(body);
        }
        assert!(seen.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[actix_web::test]
    async fn bad_input_is_400_and_service_keeps_serving() {
        let app = app!(1024);
        for body in [r#"not json"#, r#"[1, 2, 3]"#, r#"{"cough": "often"}"#] {
            let req = test::TestRequest::post()
                .uri("/predict")
                .set_payload(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                resp.headers()
                    .get(ERROR_KIND_HEADER)
                    .and_then(|v| v.to_str().ok()),
                Some("validation")
            );
            let error: ErrorResponse = test::read_body_json(resp).await;
            assert!(!error.error.is_empty());
        }

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "cough": 1 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn oversized_body_is_rejected() {
        let app = app!(16);
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "cough": 1, "high_fever": 1, "chest_pain": 0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(error.error, "Payload exceeds 16 bytes");
    }

    #[actix_web::test]
    async fn get_on_predict_is_not_allowed() {
        let app = app!(1024);
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/predict").to_request()).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn shipped_artifact_answers_known_scenario() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../artifacts/pipeline.json");
        let bundle = crate::artifact::ArtifactBundle::load(&path).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(PredictionService::new(bundle)))
                .app_data(web::Data::new(RouteConfig {
                    payload_limit: 4096,
                }))
                .configure(configure_routes),
        )
        .await;

        let mut payload = serde_json::Map::new();
        for feature in [
            "stomach_pain", "vomiting", "fatigue", "anxiety", "weight_loss", "restlessness",
            "lethargy", "breathlessness", "loss_of_appetite", "malaise", "chest_pain",
            "fast_heart_rate", "obesity", "swollen_extremeties",
            "history_of_alcohol_consumption", "palpitations",
        ] {
            payload.insert(feature.to_string(), json!(0));
        }
        for feature in ["high_fever", "cough", "mild_fever"] {
            payload.insert(feature.to_string(), json!(1));
        }

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: PredictResponse = test::read_body_json(resp).await;
        assert_eq!(body.results.len(), 1);
        assert!(!body.results[0].disease.is_empty());
        assert!((0.0..=1.0).contains(&body.results[0].probability));
    }
}
