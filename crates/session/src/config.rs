//! Konfiguration der Client-Sitzung

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Einstellungen einer Sitzung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// WebSocket-Endpunkt des Relays (ohne `room`-Parameter)
    pub signaling_endpoint: String,
    /// Basis fuer teilbare Raum-Links
    pub share_origin: String,
    /// Wie lange `link_kopiert` nach `share_room` gesetzt bleibt
    pub share_ack_ms: u64,
    /// STUN/TURN-Server fuer die Peer-Verbindung
    pub ice_servers: Vec<String>,
    /// Vorgaben fuer die Mikrofon-Aufnahme
    pub audio: AudioConstraints,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling_endpoint: "ws://127.0.0.1:8000/ws".to_string(),
            share_origin: "https://ducktunnel.com".to_string(),
            share_ack_ms: 2000,
            ice_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            audio: AudioConstraints::default(),
        }
    }
}

impl SessionConfig {
    pub fn share_ack(&self) -> Duration {
        Duration::from_millis(self.share_ack_ms)
    }
}

/// Aufnahme-Vorgaben, an `MediaCapture::acquire` durchgereicht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}
