//! Prometheus-kompatible Metriken fuer den Ducktunnel-Relay
//!
//! Registrierte Metriken:
//! - `ducktunnel_connected_peers` – Gauge: Aktuell zugelassene Verbindungen
//! - `ducktunnel_rooms_active` – Gauge: Raeume mit mindestens einem Teilnehmer
//! - `ducktunnel_signals_relayed_total` – Counter: Weitergeleitete Nachrichten
//! - `ducktunnel_signals_dropped_total` – Counter: Verworfene Nachrichten (kein Peer im Raum)
//! - `ducktunnel_joins_rejected_total` – Counter: Abgelehnte Beitritte (Raum voll)
//! - `ducktunnel_peer_departures_total` – Counter: Abgaenge, bei denen ein Peer benachrichtigt wurde
//! - `ducktunnel_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Relay-Metriken
///
/// Clone teilt die zugrunde liegenden Zaehler.
#[derive(Clone)]
pub struct RelayMetriken {
    pub registry: Arc<Registry>,

    pub connected_peers: IntGauge,
    pub rooms_active: IntGauge,
    pub signals_relayed_total: IntCounter,
    pub signals_dropped_total: IntCounter,
    pub joins_rejected_total: IntCounter,
    pub peer_departures_total: IntCounter,

    pub http_requests_total: IntCounterVec,
}

impl RelayMetriken {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let connected_peers = IntGauge::with_opts(Opts::new(
            "ducktunnel_connected_peers",
            "Anzahl aktuell zugelassener Relay-Verbindungen",
        ))?;
        registry.register(Box::new(connected_peers.clone()))?;

        let rooms_active = IntGauge::with_opts(Opts::new(
            "ducktunnel_rooms_active",
            "Anzahl belegter Raeume",
        ))?;
        registry.register(Box::new(rooms_active.clone()))?;

        let signals_relayed_total = IntCounter::with_opts(Opts::new(
            "ducktunnel_signals_relayed_total",
            "Gesamtanzahl weitergeleiteter Signal-Nachrichten",
        ))?;
        registry.register(Box::new(signals_relayed_total.clone()))?;

        let signals_dropped_total = IntCounter::with_opts(Opts::new(
            "ducktunnel_signals_dropped_total",
            "Signal-Nachrichten ohne Empfaenger (kein Peer im Raum)",
        ))?;
        registry.register(Box::new(signals_dropped_total.clone()))?;

        let joins_rejected_total = IntCounter::with_opts(Opts::new(
            "ducktunnel_joins_rejected_total",
            "Abgelehnte Beitritte wegen vollem Raum",
        ))?;
        registry.register(Box::new(joins_rejected_total.clone()))?;

        let peer_departures_total = IntCounter::with_opts(Opts::new(
            "ducktunnel_peer_departures_total",
            "Abgaenge, bei denen der verbleibende Peer benachrichtigt wurde",
        ))?;
        registry.register(Box::new(peer_departures_total.clone()))?;

        let http_requests_total = IntCounterVec::new(
            Opts::new(
                "ducktunnel_http_requests_total",
                "Gesamtanzahl HTTP-Anfragen",
            ),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_peers,
            rooms_active,
            signals_relayed_total,
            signals_dropped_total,
            joins_rejected_total,
            peer_departures_total,
            http_requests_total,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: RelayMetriken) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<RelayMetriken>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
