//! # Server Configuration
//!
//! This module contains the application state, router assembly and server
//! startup for the portal maintenance API. Admin routes sit behind the
//! session middleware; everything the handlers need travels in [`AppState`]
//! rather than ambient globals.

use std::sync::Arc;

use axum::{
    Router,
    middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{self, SessionKey};
use crate::config::AppConfig;
use crate::handlers;
use crate::mail::{Mailer, MockMailer, SmtpMailer};
use crate::pdf::GotenbergClient;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub session_key: SessionKey,
    pub mailer: Arc<dyn Mailer>,
    pub gotenberg: GotenbergClient,
}

impl AppState {
    /// Wires the state from configuration: session key, mailer (SMTP when
    /// configured, recording mock otherwise) and the Gotenberg client.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let session_key = SessionKey::from_config(&config);

        let mailer: Arc<dyn Mailer> = match SmtpMailer::from_config(&config.smtp) {
            Some(smtp) => Arc::new(smtp),
            None => {
                tracing::warn!(
                    "SMTP not configured; outgoing mail is recorded, not delivered"
                );
                Arc::new(MockMailer::new())
            }
        };

        let gotenberg = GotenbergClient::new(config.gotenberg_url.clone());

        Self {
            config: Arc::new(config),
            db: Arc::new(db),
            session_key,
            mailer,
            gotenberg,
        }
    }

    /// Replaces the mailer, keeping everything else (used by tests).
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let admin = Router::new()
        .route(
            "/portals",
            get(handlers::portals::list_portals).post(handlers::portals::create_portal),
        )
        .route(
            "/portals/{id}",
            get(handlers::portals::get_portal_detail)
                .put(handlers::portals::update_portal)
                .delete(handlers::portals::delete_portal),
        )
        .route(
            "/portals/{id}/qr-code",
            post(handlers::qr_codes::associate).delete(handlers::qr_codes::unassociate),
        )
        .route(
            "/portals/{id}/qr-code/lost",
            post(handlers::qr_codes::mark_lost),
        )
        .route(
            "/portals/{id}/interventions",
            post(handlers::interventions::create_intervention),
        )
        .route("/qr-codes/{id}", get(handlers::qr_codes::get_qr_code))
        .route(
            "/qr-codes/{id}/damaged",
            post(handlers::qr_codes::mark_damaged),
        )
        .route(
            "/interventions/{id}",
            get(handlers::interventions::get_intervention)
                .delete(handlers::interventions::delete_intervention),
        )
        .route(
            "/interventions/{id}/report",
            get(handlers::interventions::get_report_pdf),
        )
        .route(
            "/interventions/{id}/report/send",
            post(handlers::interventions::send_report),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/portals/{id}", get(handlers::portals::get_portal))
        .route("/qr/{id}", get(handlers::qr_codes::qr_redirect))
        .nest("/admin", admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    // Apply pending migrations in deterministic order before serving.
    use migration::MigratorTrait;
    migration::Migrator::up(&db, None).await?;

    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = AppState::new(config, db);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::portals::get_portal,
        crate::handlers::portals::list_portals,
        crate::handlers::portals::create_portal,
        crate::handlers::portals::get_portal_detail,
        crate::handlers::portals::update_portal,
        crate::handlers::portals::delete_portal,
        crate::handlers::qr_codes::qr_redirect,
        crate::handlers::qr_codes::get_qr_code,
        crate::handlers::qr_codes::associate,
        crate::handlers::qr_codes::unassociate,
        crate::handlers::qr_codes::mark_lost,
        crate::handlers::qr_codes::mark_damaged,
        crate::handlers::interventions::create_intervention,
        crate::handlers::interventions::get_intervention,
        crate::handlers::interventions::delete_intervention,
        crate::handlers::interventions::get_report_pdf,
        crate::handlers::interventions::send_report,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::auth::RegisterRequestDto,
            crate::handlers::auth::LoginRequestDto,
            crate::handlers::auth::UserDto,
            crate::handlers::portals::PortalDto,
            crate::handlers::portals::PortalDetailDto,
            crate::handlers::portals::CreatePortalRequestDto,
            crate::handlers::portals::UpdatePortalRequestDto,
            crate::handlers::qr_codes::QrCodeDto,
            crate::handlers::qr_codes::AssociateRequestDto,
            crate::handlers::interventions::InterventionDto,
            crate::handlers::interventions::ControlDto,
            crate::handlers::interventions::CreateInterventionRequestDto,
            crate::handlers::interventions::CreateInterventionResponseDto,
        )
    ),
    info(
        title = "Portal Maintenance API",
        description = "Portal maintenance tracking: portals, QR code stickers, interventions and reports",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
