//! Relay-Verbindung – ein Task pro WebSocket
//!
//! Jede angenommene WebSocket-Verbindung bekommt einen eigenen Task. Er
//! tritt dem Raum bei, leitet eingehende Text-Frames unveraendert an den
//! Peer weiter und schreibt alles aus der eigenen Send-Queue auf den Socket.
//! Frames werden nie geparst.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use ducktunnel_core::{ConnectionId, RoomId};
use ducktunnel_protocol::RelayNotice;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::sync::watch;

use crate::raum::PeerSender;
use crate::registry::RaumRegistry;

/// Verarbeitet eine einzelne Relay-Verbindung
pub struct PeerVerbindung {
    registry: RaumRegistry,
    raum: RoomId,
    peer_addr: Option<SocketAddr>,
    verbindung: ConnectionId,
}

impl PeerVerbindung {
    /// Erstellt eine neue Verbindung fuer `raum`
    pub fn neu(registry: RaumRegistry, raum: RoomId, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            registry,
            raum,
            peer_addr,
            verbindung: ConnectionId::new(),
        }
    }

    /// Startet die Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, ein Socket-Fehler auftritt oder ein
    /// Shutdown-Signal eingeht. Der Raum wird auf jedem dieser Wege verlassen.
    pub async fn verarbeiten(self, socket: WebSocket, mut shutdown_rx: watch::Receiver<bool>) {
        let raum = self.raum.clone();
        let verbindung = self.verbindung;
        let peer = self
            .peer_addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unbekannt".to_string());

        tracing::info!(peer = %peer, raum = %raum, verbindung = %verbindung, "Neue Relay-Verbindung");

        let (sender, mut sende_rx) = PeerSender::neu(verbindung);
        let (mut schreiber, mut leser) = socket.split();

        let belegung = match self.registry.beitreten(raum.clone(), sender) {
            Ok(belegung) => belegung,
            Err(e) => {
                tracing::info!(peer = %peer, raum = %raum, fehler = %e, "Verbindung abgewiesen");
                let _ = schreiber
                    .send(Message::Text(RelayNotice::RoomFull.to_json()))
                    .await;
                let _ = schreiber
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::POLICY,
                        reason: "room full".into(),
                    })))
                    .await;
                return;
            }
        };

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = leser.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            belegung.weiterleiten(text);
                        }
                        Some(Ok(Message::Binary(daten))) => {
                            tracing::debug!(
                                verbindung = %verbindung,
                                bytes = daten.len(),
                                "Binaer-Frame ignoriert"
                            );
                        }
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(peer = %peer, verbindung = %verbindung, "Verbindung vom Client getrennt");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                peer = %peer,
                                verbindung = %verbindung,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                    }
                }

                // Ausgehend: Frame vom Peer oder Relay-Hinweis
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = schreiber.send(Message::Text(ausgehend.into_text())).await {
                        tracing::warn!(
                            peer = %peer,
                            verbindung = %verbindung,
                            fehler = %e,
                            "Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer, verbindung = %verbindung, "Shutdown-Signal – Verbindung wird getrennt");
                        let _ = schreiber
                            .send(Message::Close(Some(CloseFrame {
                                code: close_code::AWAY,
                                reason: "server shutting down".into(),
                            })))
                            .await;
                        break;
                    }
                }
            }
        }

        drop(belegung);
        tracing::info!(peer = %peer, verbindung = %verbindung, "Verbindungs-Task beendet");
    }
}
