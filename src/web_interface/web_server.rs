use std::net::{IpAddr, SocketAddr};

use log::info;
use warp::Filter;

use super::routes::{
    batch_route, control_route, interface_ranking_route, prefix_ranking_route, speed_route,
    stats_route, status_route, view_route,
};
use crate::control::ControlClient;
use crate::error_handling::types::WebError;
use crate::view::SharedDashboard;

/// JSON API over the shared dashboard, read by the rendering layer. Control
/// requests are relayed to the backend.
pub struct WebServer {
    dashboard: SharedDashboard,
    control: ControlClient,
}

impl WebServer {
    pub fn new(dashboard: SharedDashboard, control: ControlClient) -> Self {
        Self { dashboard, control }
    }

    pub fn address(bind_address: &str, port: u16) -> Result<SocketAddr, WebError> {
        let ip: IpAddr = bind_address
            .parse()
            .map_err(|_| WebError::BindFailed(format!("invalid bind address '{}'", bind_address)))?;
        Ok(SocketAddr::new(ip, port))
    }

    /// Serves the API until the task is dropped.
    pub async fn start(&self, bind_address: &str, port: u16) -> Result<(), WebError> {
        let addr = Self::address(bind_address, port)?;

        // warp panics on bind failure, check the address first
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebError::BindFailed(format!("{}: {}", addr, e)))?;
        drop(listener);

        let routes = stats_route(self.dashboard.clone())
            .or(interface_ranking_route(self.dashboard.clone()))
            .or(prefix_ranking_route(self.dashboard.clone()))
            .or(view_route(self.dashboard.clone()))
            .or(batch_route(self.dashboard.clone()))
            .or(status_route(self.control.clone()))
            // speed before the catch-all action segment
            .or(speed_route(self.control.clone()))
            .or(control_route(self.control.clone(), self.dashboard.clone()));

        info!("Serving dashboard API on http://{}", addr);
        warp::serve(routes).run(addr).await;

        Ok(())
    }
}
