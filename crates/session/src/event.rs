//! Ereignis-Queue der Sitzung
//!
//! Befehle vom `SessionHandle`, Meldungen der Collaborators und Timer laufen
//! alle durch eine einzige mpsc-Queue und werden nacheinander verarbeitet.
//! Collaborator-Meldungen tragen die Generation der Verbindung, fuer die der
//! `EventSink` ausgegeben wurde; nach einem Abbau sind sie veraltet und
//! werden verworfen.

use ducktunnel_core::Result;
use tokio::sync::{mpsc, oneshot};

use crate::capability::Candidate;
use crate::state::SessionSnapshot;

/// Meldungen der Collaborators an die Sitzung
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Text-Frame vom Relay
    SignalText(String),
    /// Signaling-Socket wurde geschlossen
    SignalingClosed,
    /// Signaling-Socket ist mit Fehler abgebrochen
    SignalingError(String),
    /// Lokal gefundener ICE-Kandidat
    LocalCandidate(Candidate),
    /// Remote-Audio-Track ist eingetroffen
    RemoteTrack,
}

/// Befehle vom `SessionHandle`, jeweils mit eigenem Antwortkanal
#[derive(Debug)]
pub(crate) enum Befehl {
    Join {
        room: String,
        antwort: oneshot::Sender<Result<()>>,
    },
    StartCall {
        antwort: oneshot::Sender<Result<()>>,
    },
    ToggleMute {
        antwort: oneshot::Sender<Result<bool>>,
    },
    ShareRoom {
        antwort: oneshot::Sender<Result<String>>,
    },
    LeaveRoom {
        antwort: oneshot::Sender<Result<()>>,
    },
    /// Snapshot nach allen zuvor eingereihten Ereignissen
    Settle {
        antwort: oneshot::Sender<Result<SessionSnapshot>>,
    },
}

/// Eintrag der Ereignis-Queue
#[derive(Debug)]
pub(crate) enum Ereignis {
    Befehl(Befehl),
    Collaborator { generation: u64, event: SessionEvent },
    /// `link_kopiert` zuruecksetzen, sofern seitdem nicht neu geteilt wurde
    ShareAckAbgelaufen { share_seq: u64 },
    /// Letzter Handle wurde verworfen
    Shutdown,
}

/// Rueckkanal fuer Collaborator-Meldungen
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<Ereignis>,
}

impl EventSink {
    pub(crate) fn neu(generation: u64, tx: mpsc::UnboundedSender<Ereignis>) -> Self {
        Self { generation, tx }
    }

    /// Meldet ein Ereignis; `false` wenn die Sitzung beendet ist
    pub fn emit(&self, event: SessionEvent) -> bool {
        self.tx
            .send(Ereignis::Collaborator {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
