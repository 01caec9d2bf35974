//! ducktunnel-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, Raum-Registry, Signaling-Relay und
//! Observability-Server und stellt den Einstiegspunkt fuer
//! Integrationstests bereit.

pub mod config;
pub mod tls;

use anyhow::{Context, Result};
use config::ServerConfig;
use ducktunnel_observability::{observability_server_starten, HealthState, RelayMetriken};
use ducktunnel_signaling::{
    auf_shutdown_warten, relay_router, RaumRegistry, RelayState, SignalingServer,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Relay-Listener binden
    /// 2. Ctrl-C-Handler installieren
    /// 3. Observability-Server und Relay starten
    pub async fn starten(self) -> Result<()> {
        let adresse = self.config.relay_bind_adresse();
        let listener = TcpListener::bind(&adresse)
            .await
            .with_context(|| format!("Relay-Adresse '{adresse}' nicht bindbar"))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                    let _ = shutdown_tx.send(true);
                }
                Err(e) => {
                    tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
                    std::future::pending::<()>().await;
                }
            }
        });

        self.ausfuehren(listener, shutdown_rx).await
    }

    /// Bedient den Relay auf einem bereits gebundenen Listener bis
    /// `shutdown_rx` auf `true` wechselt
    pub async fn ausfuehren(
        self,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<()> {
        // Zertifikat vor dem Start laden
        let tls_config = self
            .config
            .netzwerk
            .tls
            .as_ref()
            .map(tls::tls_konfiguration_laden)
            .transpose()?;

        let metriken = RelayMetriken::neu().context("Metriken konnten nicht registriert werden")?;
        let registry = RaumRegistry::neu(metriken.clone());
        let health = HealthState::neu(metriken.clone());

        let relay_addr = listener.local_addr()?;
        tracing::info!(
            server_name = %self.config.server.name,
            relay = %relay_addr,
            pfad = %self.config.netzwerk.ws_pfad,
            origins = self.config.netzwerk.erlaubte_origins.len(),
            tls = tls_config.is_some(),
            "Server startet"
        );

        // Health meldet "draining" sobald der Shutdown beginnt
        {
            let health = health.clone();
            let rx = shutdown_rx.clone();
            tokio::spawn(async move {
                auf_shutdown_warten(rx).await;
                health.draining_setzen();
            });
        }

        if self.config.observability.aktiviert {
            let adresse = self.config.observability_bind_adresse();
            match adresse.parse::<SocketAddr>() {
                Ok(obs_addr) => {
                    let rx = shutdown_rx.clone();
                    let metriken = metriken.clone();
                    let health = health.clone();
                    tokio::spawn(async move {
                        if let Err(e) = observability_server_starten(
                            obs_addr,
                            metriken,
                            health,
                            auf_shutdown_warten(rx),
                        )
                        .await
                        {
                            tracing::error!(fehler = %e, "Observability-Server beendet");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        adresse = %adresse,
                        fehler = %e,
                        "Ungueltige Observability-Adresse, Server wird nicht gestartet"
                    );
                }
            }
        }

        match tls_config {
            Some(tls_config) => {
                let state =
                    RelayState::neu(registry, self.config.relay_config(), shutdown_rx.clone());
                tls::relay_tls_bedienen(listener, relay_router(state), tls_config, shutdown_rx)
                    .await?;
            }
            None => {
                let relay = SignalingServer::neu(registry, self.config.relay_config(), relay_addr);
                relay
                    .mit_listener(listener, shutdown_rx)
                    .await
                    .context("Signaling-Relay abgebrochen")?;
            }
        }

        tracing::info!("Server beendet");
        Ok(())
    }
}
