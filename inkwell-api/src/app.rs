/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use inkwell_api::{app::{build_router, AppState}, config::Config};
/// use inkwell_shared::cache::ResponseCache;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config, ResponseCache::disabled()));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use inkwell_shared::cache::ResponseCache;
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;
use crate::error::ApiError;
use crate::middleware::{rate_limit::rate_limit_layer, security::SecurityHeadersLayer};
use crate::routes;

/// Largest accepted request body
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub cache: ResponseCache,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, cache: ResponseCache) -> Self {
        Self {
            db,
            config: Arc::new(config),
            cache,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health
/// /api/comments        public create (rate limited), public tree, moderation
/// /api/likes           public like/unlike (rate limited), counts
/// /api/activity        public record (rate limited), editor reports
/// /api/post            public published posts, editor CRUD
/// /api/category        public active categories, editor CRUD
/// /api/site-content    public page blocks, editor upserts
/// /api/newsletter      public subscribe/unsubscribe (rate limited), admin list
/// /api/users           registration (rate limited), self-service, admin
/// ```
///
/// Gated handlers authenticate through the `Authenticated` extractor and
/// check roles themselves.
pub fn build_router(state: AppState) -> Router {
    let limited = || from_fn_with_state(state.clone(), rate_limit_layer);

    let comment_routes = Router::new()
        .route(
            "/",
            post(routes::comments::create_comment.layer(limited()))
                .get(routes::comments::list_comments),
        )
        .route("/stats", get(routes::comments::comment_stats))
        .route("/post/:post_id", get(routes::comments::list_post_comments))
        .route(
            "/:id",
            patch(routes::comments::update_comment_status)
                .delete(routes::comments::delete_comment),
        );

    let like_routes = Router::new()
        .route(
            "/",
            post(routes::likes::like_post.layer(limited()))
                .delete(routes::likes::unlike_post.layer(limited())),
        )
        .route("/count/:post_id", get(routes::likes::like_count))
        .route("/status/:post_id", get(routes::likes::like_status));

    let activity_routes = Router::new()
        .route(
            "/",
            post(routes::activity::record_activity.layer(limited()))
                .get(routes::activity::list_activity),
        )
        .route("/post/:post_id/summary", get(routes::activity::post_summary));

    let post_routes = Router::new()
        .route(
            "/",
            get(routes::posts::list_published_posts).post(routes::posts::create_post),
        )
        .route("/all", get(routes::posts::list_all_posts))
        .route("/slug/:slug", get(routes::posts::get_post_by_slug))
        .route(
            "/:id",
            get(routes::posts::get_post)
                .put(routes::posts::update_post)
                .delete(routes::posts::delete_post),
        );

    let category_routes = Router::new()
        .route(
            "/",
            get(routes::categories::list_active_categories)
                .post(routes::categories::create_category),
        )
        .route("/all", get(routes::categories::list_all_categories))
        .route("/slug/:slug", get(routes::categories::get_category_by_slug))
        .route(
            "/:id",
            put(routes::categories::update_category).delete(routes::categories::delete_category),
        );

    let site_content_routes = Router::new()
        .route("/", get(routes::site_content::list_all_content))
        .route("/:page_key", get(routes::site_content::get_page_content))
        .route(
            "/:page_key/:section_key",
            get(routes::site_content::get_section)
                .put(routes::site_content::upsert_section)
                .delete(routes::site_content::delete_section),
        );

    let newsletter_routes = Router::new()
        .route(
            "/subscribe",
            post(routes::newsletter::subscribe.layer(limited())),
        )
        .route(
            "/unsubscribe",
            post(routes::newsletter::unsubscribe.layer(limited())),
        )
        .route("/subscribers", get(routes::newsletter::list_subscribers));

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/register", post(routes::users::register.layer(limited())))
        .route("/me", get(routes::users::me))
        .route("/me/password", put(routes::users::change_password))
        .route(
            "/:id",
            patch(routes::users::update_user_access).delete(routes::users::delete_user),
        );

    let api_routes = Router::new()
        .nest("/comments", comment_routes)
        .nest("/likes", like_routes)
        .nest("/activity", activity_routes)
        .nest("/post", post_routes)
        .nest("/category", category_routes)
        .nest("/site-content", site_content_routes)
        .nest("/newsletter", newsletter_routes)
        .nest("/users", user_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
