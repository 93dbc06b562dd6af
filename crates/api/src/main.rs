use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use correlheat_core::config::Settings;
use correlheat_core::ingest::{HttpJsonPriceProvider, JsonFilePriceProvider, PriceHistoryProvider};
use correlheat_core::request::{CorrelationForm, PartialForm};
use correlheat_core::{CorrelError, CorrelationReport};

mod page;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let provider = build_provider(&settings)?;
    tracing::info!(provider = provider.provider_name(), "price provider ready");

    let state = AppState {
        provider,
        lookback_days: settings.default_lookback_days,
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/api/correlation", get(api_correlation))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn build_provider(settings: &Settings) -> anyhow::Result<Arc<dyn PriceHistoryProvider>> {
    if let Some(path) = &settings.prices_file {
        return Ok(Arc::new(JsonFilePriceProvider::new(path)));
    }
    let http = HttpJsonPriceProvider::from_settings(settings)?;
    Ok(Arc::new(http))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    provider: Arc<dyn PriceHistoryProvider>,
    lookback_days: i64,
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let form = CorrelationForm::with_defaults(state.lookback_days);
    Html(page::render(&form, &PageOutcome::Empty))
}

async fn submit(State(state): State<AppState>, Form(submitted): Form<PartialForm>) -> Html<String> {
    let form = CorrelationForm::with_defaults(state.lookback_days).merge(submitted);
    let outcome = match compute(&state, &form).await {
        Ok(report) => PageOutcome::Report(Box::new(report)),
        Err(err) => PageOutcome::Error(err.to_string()),
    };
    Html(page::render(&form, &outcome))
}

async fn api_correlation(
    State(state): State<AppState>,
    Query(submitted): Query<PartialForm>,
) -> Result<Json<CorrelationReport>, ApiError> {
    let form = CorrelationForm::with_defaults(state.lookback_days).merge(submitted);
    let report = compute(&state, &form).await?;
    Ok(Json(report))
}

async fn compute(state: &AppState, form: &CorrelationForm) -> Result<CorrelationReport, CorrelError> {
    let request = form.validate()?;
    let res = correlheat_core::run_request(state.provider.as_ref(), &request).await;
    if let Err(err) = &res {
        match err {
            CorrelError::MissingDependency(_) => {
                let e = anyhow::Error::new(err.clone());
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %err, "price source unavailable");
            }
            _ => tracing::info!(kind = err.kind(), error = %err, "correlation request rejected"),
        }
    }
    res
}

pub(crate) enum PageOutcome {
    Empty,
    Report(Box<CorrelationReport>),
    Error(String),
}

#[derive(Debug)]
struct ApiError(CorrelError);

impl From<CorrelError> for ApiError {
    fn from(err: CorrelError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
struct ApiErrorBody<'a> {
    error: &'a str,
    kind: &'static str,
}

fn status_for(err: &CorrelError) -> StatusCode {
    match err {
        CorrelError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        CorrelError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CorrelError::DataUnavailable(_) => StatusCode::NOT_FOUND,
        CorrelError::MissingDependency(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.0.message(),
            kind: self.0.kind(),
        };
        (status_for(&self.0), Json(body)).into_response()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "correlheat-api-{name}-{}.json",
            std::process::id()
        ));
        let day = |i: usize| format!("2024-01-{:02}", i + 1);
        let series = |prices: &[f64]| {
            prices
                .iter()
                .enumerate()
                .map(|(i, p)| json!({"date": day(i), "price": p}))
                .collect::<Vec<_>>()
        };
        let v = json!({
            "AAA": series(&[100.0, 102.0, 104.0, 103.0, 105.0]),
            "BBB": series(&[50.0, 51.0, 52.0, 51.0, 53.0]),
            "CCC": series(&[200.0, 198.0, 202.0, 205.0, 207.0]),
        });
        std::fs::write(&path, v.to_string()).unwrap();
        path
    }

    fn state(path: &PathBuf) -> AppState {
        AppState {
            provider: Arc::new(JsonFilePriceProvider::new(path)),
            lookback_days: 365,
        }
    }

    fn submitted(tickers: &str, return_type: &str) -> PartialForm {
        PartialForm {
            tickers: Some(tickers.to_string()),
            start: Some("2024-01-01".to_string()),
            end: Some("2024-02-01".to_string()),
            return_type: Some(return_type.to_string()),
        }
    }

    #[tokio::test]
    async fn index_renders_default_form() {
        let path = fixture("index");
        let Html(body) = index(State(state(&path))).await;
        assert!(body.contains("AAPL, MSFT, GOOGL, NVDA"));
        assert!(!body.contains("class=\"error\""));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn submit_renders_heatmap() {
        let path = fixture("submit");
        let Html(body) = submit(State(state(&path)), Form(submitted("aaa bbb ccc", "pct"))).await;
        assert!(body.contains("Computed correlations using 4 overlapping daily returns."));
        assert!(body.contains("#b2182b"));
        assert!(body.contains(">CCC<"));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn submit_keeps_form_values_on_error() {
        let path = fixture("submit-error");
        let Html(body) = submit(State(state(&path)), Form(submitted("aaa", "pct"))).await;
        assert!(body.contains("Enter at least two ticker symbols"));
        assert!(body.contains("value=\"aaa\""));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn api_returns_json_report() {
        let path = fixture("api");
        let Json(report) = api_correlation(State(state(&path)), Query(submitted("AAA,BBB", "log")))
            .await
            .unwrap();
        assert_eq!(report.result.tickers, vec!["AAA", "BBB"]);
        assert_eq!(report.result.observation_count, 4);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn api_maps_errors_to_status() {
        let path = fixture("api-error");
        let err = api_correlation(State(state(&path)), Query(submitted("QQQ SPY", "log")))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = api_correlation(State(state(&path)), Query(submitted("AAA BBB", "weird")))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_for(&CorrelError::insufficient_data("x")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&CorrelError::missing_dependency("x")),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
