//! Posts a sample symptom payload to a running service and prints the answer.
//!
//! Usage: `predict-client [BASE_URL]` (defaults to `http://127.0.0.1:5000`).

use serde_json::{json, Value};
use shared::{PredictOutcome, REQUEST_ID_HEADER};
use url::Url;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

fn sample_payload() -> Value {
    json!({
        "stomach_pain": 0, "vomiting": 1, "fatigue": 1, "anxiety": 0,
        "weight_loss": 0, "restlessness": 0, "lethargy": 1, "cough": 1,
        "high_fever": 1, "breathlessness": 0, "loss_of_appetite": 0, "mild_fever": 1,
        "malaise": 1, "chest_pain": 0, "fast_heart_rate": 0, "obesity": 0,
        "swollen_extremeties": 0, "history_of_alcohol_consumption": 0, "palpitations": 0
    })
}

fn predict_url(base: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("predict")
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let base = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let url = predict_url(&base)?;
    log::info!("POST {}", url);

    let response = reqwest::Client::new()
        .post(url)
        .json(&sample_payload())
        .send()
        .await?;
    let status = response.status();
    if let Some(request_id) = response.headers().get(REQUEST_ID_HEADER) {
        log::info!("Request id: {:?}", request_id);
    }

    match response.json::<PredictOutcome>().await? {
        PredictOutcome::Success(body) => {
            for result in body.results {
                println!("{} ({:.2}%)", result.disease, result.probability * 100.0);
            }
        }
        PredictOutcome::Failure(body) => {
            eprintln!("Prediction failed with {}: {}", status, body.error);
            std::process::exit(1);
        }
    }
    Ok(())
}
