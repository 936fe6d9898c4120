//! Ballotbox server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware, routing::get};
use ballotbox_api::{AppState, StreamingState, router as api_router, streaming_handler};
use ballotbox_common::Config;
use ballotbox_core::{
    AuditService, AuthService, BallotService, DashboardService, ElectionService,
    ResultsPublisherService, TallyService,
};
use ballotbox_db::repositories::{
    BallotRepository, CandidateRepository, ElectionRepository, PortfolioRepository,
    UserRepository, VoteActionRepository, VoterElectionRepository, VoterRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on request bodies; a full ballot is far smaller.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ballotbox=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting ballotbox server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = Arc::new(ballotbox_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    ballotbox_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let voter_repo = VoterRepository::new(Arc::clone(&db));
    let election_repo = ElectionRepository::new(Arc::clone(&db));
    let portfolio_repo = PortfolioRepository::new(Arc::clone(&db));
    let candidate_repo = CandidateRepository::new(Arc::clone(&db));
    let voter_election_repo = VoterElectionRepository::new(Arc::clone(&db));
    let vote_action_repo = VoteActionRepository::new(Arc::clone(&db));
    let ballot_repo = BallotRepository::new(Arc::clone(&db));

    // Realtime fan-out, injected into the ballot service
    let streaming = StreamingState::new(config.streaming.channel_capacity);
    let publisher: ResultsPublisherService = Arc::new(streaming.clone());

    // Initialize services
    let auth_service = AuthService::new(user_repo, voter_repo.clone());
    let tally_service = TallyService::new(
        election_repo.clone(),
        portfolio_repo.clone(),
        candidate_repo.clone(),
        vote_action_repo.clone(),
        voter_election_repo.clone(),
    );
    let ballot_service = BallotService::new(
        election_repo.clone(),
        portfolio_repo.clone(),
        candidate_repo.clone(),
        voter_repo.clone(),
        ballot_repo,
        tally_service.clone(),
        publisher,
    );
    let election_service = ElectionService::new(
        election_repo.clone(),
        portfolio_repo.clone(),
        candidate_repo.clone(),
        voter_repo.clone(),
        voter_election_repo.clone(),
    );
    let dashboard_service = DashboardService::new(
        election_repo.clone(),
        portfolio_repo.clone(),
        candidate_repo.clone(),
        voter_repo.clone(),
        voter_election_repo.clone(),
        tally_service.clone(),
    );
    let audit_service = AuditService::new(
        election_repo,
        vote_action_repo,
        voter_repo,
        voter_election_repo,
        portfolio_repo,
        candidate_repo,
    );

    let state = AppState {
        auth_service,
        ballot_service,
        tally_service,
        election_service,
        audit_service,
        dashboard_service,
        streaming,
    };

    // Build router
    let app = Router::new()
        .route("/streaming", get(streaming_handler))
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ballotbox_api::middleware::auth_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        // Bounds time to the response head only; streams stay open.
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
