//! HTTP-Oberflaeche des Relays – WebSocket-Upgrade und Listener
//!
//! Ein einziger Endpunkt (Standard `/ws`) nimmt WebSocket-Upgrades mit dem
//! Query-Parameter `room` an. Ohne Raum antwortet der Relay mit HTTP 400,
//! bei nicht erlaubtem Origin mit HTTP 403. Alle anderen Pfade liefern 404.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        ConnectInfo, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use ducktunnel_core::RoomId;
use ducktunnel_observability::timing_middleware;
use ducktunnel_protocol::ROOM_PARAM;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::connection::PeerVerbindung;
use crate::error::SignalingResult;
use crate::registry::RaumRegistry;

/// Standardpfad des WebSocket-Endpunkts
pub const STANDARD_PFAD: &str = "/ws";

/// Standardgrenze fuer eine einzelne Nachricht (64 KiB)
pub const STANDARD_MAX_NACHRICHT_BYTES: usize = 64 * 1024;

/// Konfiguration des Relay-Endpunkts
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Pfad des WebSocket-Endpunkts
    pub pfad: String,
    /// Erlaubte `Origin`-Header; leer bedeutet alle erlaubt
    pub erlaubte_origins: Vec<String>,
    /// Maximale Groesse einer Nachricht in Bytes
    pub max_nachricht_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            pfad: STANDARD_PFAD.to_string(),
            erlaubte_origins: Vec::new(),
            max_nachricht_bytes: STANDARD_MAX_NACHRICHT_BYTES,
        }
    }
}

impl RelayConfig {
    /// Prueft einen `Origin`-Header gegen die Allow-List
    pub fn origin_erlaubt(&self, origin: Option<&str>) -> bool {
        if self.erlaubte_origins.is_empty() {
            return true;
        }
        match origin {
            Some(o) => self.erlaubte_origins.iter().any(|e| e == o),
            None => false,
        }
    }
}

/// Gemeinsamer Zustand aller Relay-Handler
#[derive(Clone)]
pub struct RelayState {
    pub registry: RaumRegistry,
    pub config: Arc<RelayConfig>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RelayState {
    pub fn neu(
        registry: RaumRegistry,
        config: RelayConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            registry,
            config: Arc::new(config),
            shutdown_rx,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RaumParameter {
    room: Option<String>,
}

/// Baut den Router des Relays
pub fn relay_router(state: RelayState) -> Router {
    let metriken = state.registry.metriken().clone();
    let pfad = state.config.pfad.clone();
    Router::new()
        .route(&pfad, get(upgrade_handler))
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            metriken,
            timing_middleware,
        ))
}

async fn upgrade_handler(
    State(state): State<RelayState>,
    Query(parameter): Query<RaumParameter>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let raum = match parameter.room.as_deref().and_then(RoomId::roh) {
        Some(raum) => raum,
        None => {
            tracing::debug!(parameter = ROOM_PARAM, "Upgrade ohne Raum abgelehnt");
            return (StatusCode::BAD_REQUEST, "Room ID is required").into_response();
        }
    };

    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    if !state.config.origin_erlaubt(origin) {
        tracing::warn!(origin = ?origin, raum = %raum, "Upgrade von nicht erlaubtem Origin");
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(ablehnung) => return ablehnung.into_response(),
    };

    let peer_addr = connect_info.map(|ConnectInfo(addr)| addr);
    let registry = state.registry.clone();
    let shutdown_rx = state.shutdown_rx.clone();

    ws.max_message_size(state.config.max_nachricht_bytes)
        .on_upgrade(move |socket| async move {
            PeerVerbindung::neu(registry, raum, peer_addr)
                .verarbeiten(socket, shutdown_rx)
                .await;
        })
}

// ---------------------------------------------------------------------------
// SignalingServer
// ---------------------------------------------------------------------------

/// WebSocket-Signaling-Server
///
/// Bindet einen TCP-Socket und bedient den Relay-Router bis zum Shutdown.
pub struct SignalingServer {
    registry: RaumRegistry,
    config: RelayConfig,
    bind_addr: SocketAddr,
}

impl SignalingServer {
    /// Erstellt einen neuen SignalingServer
    pub fn neu(registry: RaumRegistry, config: RelayConfig, bind_addr: SocketAddr) -> Self {
        Self {
            registry,
            config,
            bind_addr,
        }
    }

    /// Bindet den Listener und bedient Verbindungen
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> SignalingResult<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.mit_listener(listener, shutdown_rx).await
    }

    /// Bedient Verbindungen auf einem bereits gebundenen Listener
    pub async fn mit_listener(
        self,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let lokale_addr = listener.local_addr()?;
        tracing::info!(
            adresse = %lokale_addr,
            pfad = %self.config.pfad,
            "Signaling-Relay gestartet"
        );

        let state = RelayState::neu(self.registry, self.config, shutdown_rx.clone());
        let app = relay_router(state);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(auf_shutdown_warten(shutdown_rx))
        .await?;

        tracing::info!("Signaling-Relay gestoppt");
        Ok(())
    }

    /// Gibt die Bind-Adresse zurueck
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

/// Wartet bis das Shutdown-Signal `true` wird
///
/// Ist der Sender verworfen, kann niemand mehr stoppen: dann wartet die
/// Funktion fuer immer.
pub async fn auf_shutdown_warten(mut shutdown_rx: watch::Receiver<bool>) {
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
    tracing::info!("Signaling-Relay: Shutdown-Signal empfangen");
}
