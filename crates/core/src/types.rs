//! Gemeinsame Identifikationstypen fuer Ducktunnel
//!
//! Newtype-Pattern, damit Raum-IDs und Verbindungs-IDs zur Compilezeit
//! nicht verwechselt werden koennen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raum-Kennung, vom Client frei gewaehlt (z.B. "kind-amber-duck")
///
/// Fuer den Relay ist sie opak: er prueft nur, dass sie nicht leer ist.
/// Eindeutigkeit ergibt sich allein daraus, dass zwei Clients denselben
/// String verwenden.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Erstellt eine RoomId; fuehrende/abschliessende Leerzeichen werden entfernt.
    ///
    /// Gibt `None` zurueck wenn nach dem Trimmen nichts uebrig bleibt.
    pub fn parse(roh: &str) -> Option<Self> {
        let getrimmt = roh.trim();
        if getrimmt.is_empty() {
            None
        } else {
            Some(Self(getrimmt.to_string()))
        }
    }

    /// Uebernimmt die Kennung unveraendert; nur der leere String wird abgelehnt
    pub fn roh(kennung: &str) -> Option<Self> {
        if kennung.is_empty() {
            None
        } else {
            Some(Self(kennung.to_string()))
        }
    }

    /// Gibt die Kennung als &str zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Eindeutige ID einer Relay-Verbindung (ein WebSocket = eine ID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}
