//! The form page: `GET /` renders the empty form, `POST /predict` renders
//! the form again with the result panel.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, routing::post, Router};
use log::info;
use tokio::net::TcpListener;

use crate::service::ProfitabilityService;

pub mod handler;
pub mod view;

use handler::{index, predict};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProfitabilityService>,
}

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict).get(index))
        .with_state(app_state)
}

/// Serves the page on an already bound listener until the process exits.
pub async fn serve(listener: TcpListener, service: ProfitabilityService) -> std::io::Result<()> {
    let state = AppState {
        service: Arc::new(service),
    };
    info!("Serving menu profitability predictor on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await
}

/// Binds `addr` and serves the page.
pub async fn bind_and_serve(addr: SocketAddr, service: ProfitabilityService) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, service).await
}
