use std::sync::Arc;

use axum::Form;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use tracing::{info, warn};

use super::AppState;
use super::page::{self, PageResult};
use crate::predict::{PredictError, RequestRecord};

pub async fn home() -> Html<String> {
    Html(page::render(None, PageResult::Empty))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    form: Result<Form<RequestRecord>, FormRejection>,
) -> Response {
    let record = match form {
        Ok(Form(record)) => record,
        Err(rejection) => {
            warn!("Unreadable prediction request: {rejection}");
            let message = format!(
                "A critical error occurred during prediction: {}. Please check inputs.",
                rejection.body_text()
            );
            let html = page::render(None, PageResult::Error(&message));
            return (rejection.status(), Html(html)).into_response();
        }
    };
    match state.predictor.predict(&record) {
        Ok(prediction) => {
            info!(
                outcome = prediction.outcome.label(),
                probability = prediction.probability_positive,
                "Prediction served"
            );
            Html(page::render(Some(&record), PageResult::Prediction(&prediction))).into_response()
        }
        Err(err) => {
            warn!("Prediction Error: {err}");
            let status = match &err {
                PredictError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let message =
                format!("A critical error occurred during prediction: {err}. Please check inputs.");
            let html = page::render(Some(&record), PageResult::Error(&message));
            (status, Html(html)).into_response()
        }
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "features": state.predictor.features().len(),
    }))
}
