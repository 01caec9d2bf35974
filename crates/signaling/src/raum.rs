//! Raum und Send-Handle eines Teilnehmers
//!
//! Ein `Raum` haelt hoechstens zwei `PeerSender` in Beitrittsreihenfolge.
//! Ein `PeerSender` ist die Send-Queue zu genau einer WebSocket-Verbindung;
//! der Verbindungs-Task liest daraus und schreibt auf den Socket.

use ducktunnel_core::{ConnectionId, RoomId};
use ducktunnel_protocol::RelayNotice;
use tokio::sync::mpsc;

use crate::error::{SignalingError, SignalingResult};

/// Maximale Anzahl Teilnehmer pro Raum
pub const MAX_TEILNEHMER: usize = 2;

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten
// ---------------------------------------------------------------------------

/// Was der Verbindungs-Task an seinen Client schreiben soll
#[derive(Debug, Clone, PartialEq)]
pub enum Ausgehend {
    /// Vom Peer empfangener Text-Frame, unveraendert
    Signal(String),
    /// Vom Relay erzeugter Hinweis
    Hinweis(RelayNotice),
}

impl Ausgehend {
    /// Text, der auf den Socket geschrieben wird
    pub fn into_text(self) -> String {
        match self {
            Ausgehend::Signal(text) => text,
            Ausgehend::Hinweis(hinweis) => hinweis.to_json(),
        }
    }
}

// ---------------------------------------------------------------------------
// PeerSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Relay-Verbindung
///
/// Die Queue ist unbegrenzt: eine weitergeleitete Nachricht wird nie
/// verworfen, solange die Verbindung besteht, und die Reihenfolge bleibt
/// erhalten.
#[derive(Clone, Debug)]
pub struct PeerSender {
    pub verbindung: ConnectionId,
    tx: mpsc::UnboundedSender<Ausgehend>,
}

impl PeerSender {
    /// Erstellt ein Send-Handle und die zugehoerige Empfangs-Queue
    pub fn neu(verbindung: ConnectionId) -> (Self, mpsc::UnboundedReceiver<Ausgehend>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { verbindung, tx }, rx)
    }

    /// Reiht eine Nachricht nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn der Verbindungs-Task bereits beendet ist.
    pub fn senden(&self, nachricht: Ausgehend) -> bool {
        match self.tx.send(nachricht) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(
                    verbindung = %self.verbindung,
                    "Send-Queue geschlossen (Verbindung beendet)"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Raum
// ---------------------------------------------------------------------------

/// Ein Raum mit hoechstens [`MAX_TEILNEHMER`] Teilnehmern
#[derive(Debug)]
pub(crate) struct Raum {
    id: RoomId,
    teilnehmer: Vec<PeerSender>,
}

impl Raum {
    pub(crate) fn neu(id: RoomId) -> Self {
        Self {
            id,
            teilnehmer: Vec::with_capacity(MAX_TEILNEHMER),
        }
    }

    /// Nimmt einen Teilnehmer auf; schlaegt fehl wenn der Raum voll ist
    pub(crate) fn aufnehmen(&mut self, sender: PeerSender) -> SignalingResult<()> {
        if self.teilnehmer.len() >= MAX_TEILNEHMER {
            return Err(SignalingError::RaumVoll);
        }
        self.teilnehmer.push(sender);
        Ok(())
    }

    /// Entfernt einen Teilnehmer; gibt true zurueck wenn er im Raum war
    pub(crate) fn entfernen(&mut self, verbindung: ConnectionId) -> bool {
        let vorher = self.teilnehmer.len();
        self.teilnehmer.retain(|t| t.verbindung != verbindung);
        self.teilnehmer.len() != vorher
    }

    /// Der andere Teilnehmer – nur wenn `verbindung` selbst im Raum ist
    pub(crate) fn gegenueber(&self, verbindung: ConnectionId) -> Option<&PeerSender> {
        if !self.teilnehmer.iter().any(|t| t.verbindung == verbindung) {
            return None;
        }
        self.teilnehmer.iter().find(|t| t.verbindung != verbindung)
    }

    /// Erster verbliebener Teilnehmer
    pub(crate) fn erster(&self) -> Option<&PeerSender> {
        self.teilnehmer.first()
    }

    pub(crate) fn anzahl(&self) -> usize {
        self.teilnehmer.len()
    }

    pub(crate) fn ist_leer(&self) -> bool {
        self.teilnehmer.is_empty()
    }

    pub(crate) fn id(&self) -> &RoomId {
        &self.id
    }
}
