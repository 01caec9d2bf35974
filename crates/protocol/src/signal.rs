//! Signalisierungs-Nachrichten (WebSocket, JSON)
//!
//! Alle Nachrichten sind JSON-Objekte mit einem `type`-Feld. Die Nutzlast
//! liegt unter einem Schluessel, der dem Typ entspricht:
//!
//! ```json
//! {"type": "offer",     "offer":     {"type": "offer", "sdp": "v=0..."}}
//! {"type": "answer",    "answer":    {"type": "answer", "sdp": "v=0..."}}
//! {"type": "candidate", "candidate": {"candidate": "candidate:1 1 udp ...", "sdpMid": "0"}}
//! ```
//!
//! Der Relay kennt diese Typen nicht: er leitet jeden Text-Frame unveraendert
//! weiter. Nur die Hinweise in [`RelayNotice`] erzeugt er selbst.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Signal (Client <-> Client)
// ---------------------------------------------------------------------------

/// Verbindungsaufbau-Nachricht zwischen den beiden Teilnehmern eines Raums
///
/// Die Nutzlast ist fuer das Protokoll opak (Session-Beschreibung bzw.
/// ICE-Kandidat im Format der Peer-Verbindung).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Signal {
    Offer { offer: Value },
    Answer { answer: Value },
    Candidate { candidate: Value },
}

/// Art eines Signals ohne Nutzlast (fuer Logging)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::Candidate => "candidate",
        })
    }
}

impl Signal {
    /// Gibt die Art des Signals zurueck
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Offer { .. } => SignalKind::Offer,
            Signal::Answer { .. } => SignalKind::Answer,
            Signal::Candidate { .. } => SignalKind::Candidate,
        }
    }

    /// Gibt die opake Nutzlast zurueck
    pub fn payload(&self) -> &Value {
        match self {
            Signal::Offer { offer } => offer,
            Signal::Answer { answer } => answer,
            Signal::Candidate { candidate } => candidate,
        }
    }

    /// Serialisiert das Signal als JSON-Text
    pub fn to_json(&self) -> String {
        // Value-Nutzlasten sind immer serialisierbar
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// RelayNotice (Relay -> Client)
// ---------------------------------------------------------------------------

/// Hinweise, die der Relay selbst an einen Client sendet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayNotice {
    /// Der andere Teilnehmer hat den Raum verlassen (oder seine Verbindung verloren)
    PeerLeft,
    /// Der Raum hat bereits zwei Teilnehmer; die Verbindung wird geschlossen
    RoomFull,
}

impl RelayNotice {
    /// Serialisiert den Hinweis als JSON-Text
    pub fn to_json(&self) -> String {
        match self {
            RelayNotice::PeerLeft => r#"{"type":"peer-left"}"#.to_string(),
            RelayNotice::RoomFull => r#"{"type":"room-full"}"#.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Incoming (alles, was ein Client empfangen kann)
// ---------------------------------------------------------------------------

/// Vom Client empfangene Nachricht
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Signal(Signal),
    Notice(RelayNotice),
}

/// Fehler beim Parsen einer eingehenden Nachricht
#[derive(Debug)]
pub struct ParseError(String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unbekannte Signal-Nachricht: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

impl Incoming {
    /// Parst einen empfangenen Text-Frame
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        if let Ok(signal) = serde_json::from_str::<Signal>(text) {
            return Ok(Incoming::Signal(signal));
        }
        serde_json::from_str::<RelayNotice>(text)
            .map(Incoming::Notice)
            .map_err(|e| ParseError(e.to_string()))
    }
}
