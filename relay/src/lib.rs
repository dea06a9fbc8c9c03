use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use shared::config::LiveConfig;
use shared::sync::{Clock, SpaceBus, SpaceStore, SystemClock};
use shared::types::AppConfig;

pub mod handlers;
pub mod startup;

use handlers::http::routes::Router;
use handlers::http::utils::json_response;

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: LiveConfig,
    pub store: SpaceStore,
    pub bus: Arc<SpaceBus>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Open the configured store (file-backed when `storage.path` is set)
    /// and create the bus.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let store = match config.storage.resolved_path() {
            Some(path) => SpaceStore::open(&path)
                .await
                .with_context(|| format!("Failed to open store at {}", path.display()))?,
            None => {
                info!("No storage.path configured, unified slot lives in memory only");
                SpaceStore::in_memory()
            }
        };
        let bus = Arc::new(SpaceBus::with_capacity(config.relay.channel_capacity));
        Ok(Self::with_parts(config, store, bus, Arc::new(SystemClock)))
    }

    pub fn with_parts(
        config: AppConfig,
        store: SpaceStore,
        bus: Arc<SpaceBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config: LiveConfig::new(config),
            store,
            bus,
            clock,
        }
    }
}

/// Route one request. Handler errors become a 500 JSON body so the
/// connection itself never fails on them.
pub async fn serve_request(
    req: Request<hyper::body::Incoming>,
    router: Arc<Router>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match router.route(req, state).await {
        Ok(response) => Ok(response),
        Err(e) => {
            error!("{} {} failed: {:#}", method, path, e);
            Ok(json_response::internal_error())
        }
    }
}

/// Accept connections until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    router: Arc<Router>,
    state: AppState,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let router = Arc::clone(&router);
                let state = state.clone();

                tokio::task::spawn(async move {
                    let service = service_fn(move |req| {
                        serve_request(req, Arc::clone(&router), state.clone())
                    });
                    if let Err(err) = http1::Builder::new()
                        .timer(TokioTimer::new())
                        .serve_connection(io, service)
                        .await
                    {
                        warn!("Error serving connection from {}: {:?}", peer, err);
                    }
                });
            }
            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    Ok(())
}
