use std::collections::HashMap;
use std::num::ParseIntError;
use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use thermostatd_peripherals::thermostat::{
    FanSpeed, Mode, State as UnitState, Thermostat, ThermostatError,
};
use tokio::sync::Mutex;
use url::form_urlencoded;

use crate::auth::{require_bearer, BearerToken};

/// Shared by every handler. The lock is held across validate, commit and send.
pub type SharedThermostat = Arc<Mutex<Thermostat>>;

const PREFIX: &str = "/v1/";

fn path(endpoint: &str) -> String {
    format!("{}{}", PREFIX, endpoint)
}

pub fn router(thermostat: SharedThermostat, token: Option<String>) -> Router {
    let router = Router::new()
        .route(&path("state"), get(get_state).patch(patch_state))
        .route(&path("power"), put(put_power))
        .route(&path("mode"), put(put_mode))
        .route(&path("temperature"), put(put_temperature))
        .route(&path("fan_speed"), put(put_fan_speed))
        .with_state(thermostat);

    match token {
        Some(token) => router.layer(middleware::from_fn_with_state(
            BearerToken::new(token),
            require_bearer,
        )),
        None => router,
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("rejecting request: {}", self.error);
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

impl From<ThermostatError> for ApiError {
    fn from(e: ThermostatError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<ParseIntError> for ApiError {
    fn from(e: ParseIntError) -> Self {
        Self::new(e.to_string())
    }
}

/// Request fields from the query string and an urlencoded body. Body values
/// take precedence over query values.
#[derive(Debug, Default)]
pub struct Fields(HashMap<String, String>);

impl Fields {
    fn extend_from(&mut self, encoded: &[u8]) {
        self.0.extend(
            form_urlencoded::parse(encoded).map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
    }

    /// Empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for Fields {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut fields = Fields::default();
        if let Some(query) = req.uri().query() {
            fields.extend_from(query.as_bytes());
        }

        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |ct| {
                ct.starts_with("application/x-www-form-urlencoded")
            });
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::new(e.body_text()))?;
        if is_form {
            fields.extend_from(&body);
        }

        Ok(fields)
    }
}

type ApiResult = Result<Json<UnitState>, ApiError>;

async fn get_state(State(thermostat): State<SharedThermostat>) -> Json<UnitState> {
    Json(thermostat.lock().await.state().clone())
}

async fn patch_state(State(thermostat): State<SharedThermostat>, fields: Fields) -> ApiResult {
    let mut thermostat = thermostat.lock().await;
    let mut draft = thermostat.state().clone();

    if let Some(power) = fields.get("powered_on") {
        draft.powered_on = power == "true";
    }
    if let Some(temp) = fields.get("target_temperature") {
        draft.target_temperature = temp.parse()?;
    }
    if let Some(mode) = fields.get("current_mode") {
        draft.current_mode = mode.parse()?;
    }
    if let Some(speed) = fields.get("fan_speed") {
        draft.fan_speed = speed.parse()?;
    }

    thermostat.set_state(draft).await?;
    Ok(Json(thermostat.state().clone()))
}

async fn put_power(State(thermostat): State<SharedThermostat>, fields: Fields) -> ApiResult {
    let mut thermostat = thermostat.lock().await;
    thermostat.set_power(fields.get("on") == Some("true")).await?;
    Ok(Json(thermostat.state().clone()))
}

async fn put_mode(State(thermostat): State<SharedThermostat>, fields: Fields) -> ApiResult {
    let mode: Mode = fields.get("mode").unwrap_or_default().parse()?;
    let mut thermostat = thermostat.lock().await;
    thermostat.set_mode(mode).await?;
    Ok(Json(thermostat.state().clone()))
}

async fn put_temperature(State(thermostat): State<SharedThermostat>, fields: Fields) -> ApiResult {
    let temp: i32 = fields.get("temperature").unwrap_or_default().parse()?;
    let mut thermostat = thermostat.lock().await;
    thermostat.set_target_temperature(temp).await?;
    Ok(Json(thermostat.state().clone()))
}

async fn put_fan_speed(State(thermostat): State<SharedThermostat>, fields: Fields) -> ApiResult {
    let speed: FanSpeed = fields.get("speed").unwrap_or_default().parse()?;
    let mut thermostat = thermostat.lock().await;
    thermostat.set_fan_speed(speed).await?;
    Ok(Json(thermostat.state().clone()))
}
