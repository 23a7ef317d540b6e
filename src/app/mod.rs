pub mod gate;
pub mod model;
pub mod render;

use std::path::Path;

use axum::Router;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app::gate::ScrapeGate;
use crate::app::model::WrappedForm;
use crate::scrape::ScrapeConfig;
use crate::stats::Wrapped;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ScrapeConfig,
    pub default_user_id: String,
    pub gate: ScrapeGate,
}

type HtmlResult = Result<Html<String>, (StatusCode, Html<String>)>;

pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/", get(index).post(index))
        .route("/wrapped", get(wrapped_query).post(wrapped_form))
        .route("/healthz", get(|| async { "ok\n" }));

    if let Some(dir) = static_dir.filter(|dir| dir.is_dir()) {
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render::index_page(&state.default_user_id))
}

async fn wrapped_query(
    State(state): State<AppState>,
    Query(form): Query<WrappedForm>,
) -> HtmlResult {
    wrapped(state, form).await
}

async fn wrapped_form(State(state): State<AppState>, form: Option<Form<WrappedForm>>) -> HtmlResult {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    wrapped(state, form).await
}

async fn wrapped(state: AppState, form: WrappedForm) -> HtmlResult {
    let user_id = form.user_id_or(&state.default_user_id);
    tracing::info!(user_id = %user_id, "wrapped requested");

    if let Err(err) = crate::store::validate_user_id(&user_id) {
        return Err((
            StatusCode::BAD_REQUEST,
            Html(render::error_page(&format!("{err:#}"))),
        ));
    }

    let books = state
        .gate
        .run(crate::scrape::scrape_user(&state.config, &user_id))
        .await
        .map_err(|err| {
            tracing::warn!(user_id = %user_id, ?err, "scrape failed");
            (
                StatusCode::BAD_GATEWAY,
                Html(render::error_page(&format!("scrape failed: {err:#}"))),
            )
        })?;

    let wrapped = Wrapped::compute(&user_id, &books);
    Ok(Html(render::wrapped_page(&wrapped, state.config.year)))
}
