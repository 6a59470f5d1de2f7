use std::{process, sync::Arc};

use portico::{
    application::{
        account::AccountService,
        compose::ComposeService,
        error::AppError,
        gateway::{AuthGateway, PostsGateway},
        home::HomeService,
    },
    config,
    infra::{backend::ManagedBackend, error::InfraError, http, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    // The backend client is constructed exactly once, before the listener
    // binds; request handlers only ever see it through the gateway traits.
    let backend = Arc::new(ManagedBackend::new(&settings.backend).map_err(AppError::from)?);
    let posts: Arc<dyn PostsGateway> = backend.clone();
    let auth: Arc<dyn AuthGateway> = backend;

    let state = http::HttpState {
        home: Arc::new(HomeService::new(posts.clone())),
        compose: Arc::new(ComposeService::new(posts)),
        account: Arc::new(AccountService::new(auth)),
        site_title: settings.site.title.clone(),
        cookie_secure: settings.session.cookie_secure,
    };

    serve_http(&settings, state).await
}

async fn serve_http(settings: &config::Settings, state: http::HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "portico::serve",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}
