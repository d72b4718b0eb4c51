use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Status;
use rocket::{Data, Orbit, Request, Response, Rocket};

use crate::models::AppState;

/// Logs incoming requests and outgoing responses.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request/Response Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let remote = request
            .remote()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        tracing::info!("Incoming request: {} {} from {}", request.method(), request.uri(), remote);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let method = request.method();
        let uri = request.uri();
        let status = response.status();

        if status == Status::InternalServerError {
            tracing::error!("Internal Server Error for {} {}", method, uri);
            sentry::capture_message(
                &format!("Internal Server Error: {method} {uri}"),
                sentry::Level::Error,
            );
        } else if !status.class().is_success() {
            tracing::warn!("Error response: {} {} returned {}", method, uri, status);
        } else {
            tracing::info!("Response: {} {} - Status: {}", method, uri, status);
        }
    }
}

/// Stops a running scan on shutdown so in-flight found wallets are persisted.
pub struct ScanShutdown;

#[rocket::async_trait]
impl Fairing for ScanShutdown {
    fn info(&self) -> Info {
        Info {
            name: "Scan Shutdown",
            kind: Kind::Shutdown,
        }
    }

    async fn on_shutdown(&self, rocket: &Rocket<Orbit>) {
        if let Some(state) = rocket.state::<AppState>() {
            tracing::info!("Shutting down: stopping scan workers");
            state.controller.stop_scanning().await;
        }
    }
}
