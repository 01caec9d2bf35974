//! Signaling-Transport ueber WebSocket (tokio-tungstenite)
//!
//! Pro Verbindung laeuft ein Task, der den Socket liest und die Send-Queue
//! abarbeitet. Eingehende Text-Frames, Socket-Ende und Socket-Fehler gehen
//! als `SessionEvent` an die Sitzung.

use anyhow::Context;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::capability::{SignalingChannel, SignalingConnector};
use crate::event::{EventSink, SessionEvent};

/// Baut WebSocket-Verbindungen zum Relay auf
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SignalingConnector for WebSocketConnector {
    async fn connect(
        &self,
        url: &Url,
        events: EventSink,
    ) -> anyhow::Result<Box<dyn SignalingChannel>> {
        tracing::info!(url = %url, "Verbinde mit Relay");
        let (stream, _antwort) = connect_async(url.as_str())
            .await
            .with_context(|| format!("WebSocket-Verbindung zu {url} fehlgeschlagen"))?;
        tracing::info!(url = %url, "WebSocket-Verbindung hergestellt");

        let (mut schreiber, mut leser) = stream.split();
        let (sende_tx, mut sende_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    ausgehend = sende_rx.recv() => {
                        match ausgehend {
                            Some(text) => {
                                if let Err(e) = schreiber.send(Message::text(text)).await {
                                    tracing::warn!(fehler = %e, "Senden an Relay fehlgeschlagen");
                                    events.emit(SessionEvent::SignalingError(e.to_string()));
                                    break;
                                }
                            }
                            // Kanal lokal geschlossen
                            None => {
                                let _ = schreiber.close().await;
                                break;
                            }
                        }
                    }

                    frame = leser.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                events.emit(SessionEvent::SignalText(text.to_string()));
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::info!("Relay hat die Verbindung geschlossen");
                                events.emit(SessionEvent::SignalingClosed);
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                tracing::warn!(fehler = %e, "WebSocket-Lesefehler");
                                events.emit(SessionEvent::SignalingError(e.to_string()));
                                break;
                            }
                        }
                    }
                }
            }
            tracing::debug!("Signaling-Task beendet");
        });

        Ok(Box::new(WebSocketChannel {
            sende_tx: Mutex::new(Some(sende_tx)),
        }))
    }
}

/// Offene WebSocket-Verbindung; Senden reiht nur in die Queue des Tasks ein
struct WebSocketChannel {
    sende_tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl SignalingChannel for WebSocketChannel {
    fn send(&self, text: String) -> anyhow::Result<()> {
        let guard = self.sende_tx.lock();
        let tx = guard
            .as_ref()
            .context("Signaling-Verbindung ist geschlossen")?;
        tx.send(text)
            .map_err(|_| anyhow::anyhow!("Signaling-Verbindung ist beendet"))
    }

    fn close(&self) {
        // Verwerfen des Senders schliesst den Socket im Task
        self.sende_tx.lock().take();
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.close();
    }
}
