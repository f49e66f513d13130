pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use error::AppError;
use services::{AuthorizeNetClient, OrderRepository};

/// Shared application state: immutable configuration, the gateway client,
/// and the order database pool. Nothing here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: AuthorizeNetClient,
    pub orders: OrderRepository,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration. Binds the
    /// listener immediately so tests can ask for port 0.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        services::init_metrics();

        let orders = OrderRepository::connect(&config.database)?;
        match orders.health_check().await {
            Ok(()) => tracing::info!("Database connected"),
            Err(e) => tracing::warn!(
                error = %e,
                "Database not reachable at startup; capture reconciliation will fail until it is"
            ),
        }

        let gateway = AuthorizeNetClient::new(&config.authorizenet)?;
        tracing::info!(
            endpoint = %config.authorizenet.endpoint,
            validation_mode = config.authorizenet.validation_mode.as_str(),
            "Gateway client initialized"
        );

        let cors = match &config.server.allowed_origin {
            Some(origin) => {
                let origin = origin.parse::<HeaderValue>().map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!("Invalid CORS origin: {}", e))
                })?;
                CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
            None => CorsLayer::permissive(),
        };

        let state = AppState {
            config: config.clone(),
            gateway,
            orders,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            // Customer profiles
            .route("/customer-profiles", post(handlers::profiles::create_profile))
            .route("/customer-profiles", get(handlers::profiles::list_profiles))
            .route("/customer-profiles/:id", get(handlers::profiles::get_profile))
            .route("/customer-profiles/:id", put(handlers::profiles::update_profile))
            .route(
                "/customer-profiles/:id/shipping-addresses",
                post(handlers::profiles::add_shipping_address),
            )
            .route(
                "/customer-profiles/:id/shipping-addresses/:address_id",
                delete(handlers::profiles::delete_shipping_address),
            )
            .route(
                "/customer-profiles/:id/payment-profiles",
                post(handlers::profiles::add_payment_profile),
            )
            .route(
                "/customer-profiles/:id/payment-profiles/:payment_profile_id",
                put(handlers::profiles::update_payment_profile),
            )
            .route(
                "/customer-profiles/:id/payment-profiles/:payment_profile_id",
                delete(handlers::profiles::delete_payment_profile),
            )
            .route(
                "/customer-profiles/:id/payment-profiles/:payment_profile_id/billing-address",
                put(handlers::profiles::update_billing_address),
            )
            // Transactions
            .route("/transactions", post(handlers::transactions::charge))
            .route(
                "/transactions/authorize",
                post(handlers::transactions::authorize),
            )
            .route(
                "/transactions/capture",
                post(handlers::transactions::capture),
            )
            .layer(cors)
            .layer(from_fn(middleware::request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get(middleware::REQUEST_ID_HEADER)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        let listener =
            TcpListener::bind(format!("{}:{}", config.server.host, config.server.port)).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router).await
    }
}
