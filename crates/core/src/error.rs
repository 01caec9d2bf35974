//! Fehlertypen fuer Ducktunnel
//!
//! Zentraler Fehler-Enum fuer alle Fehlerzustaende einer Anruf-Sitzung.
//! Jeder Fehler hat eine Kategorie und eine fuer Nutzer lesbare Meldung;
//! die Sitzung zeigt diese an und kehrt danach nach `disconnected` zurueck.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Globaler Result-Alias fuer Ducktunnel
pub type Result<T> = std::result::Result<T, DucktunnelError>;

/// Grobe Einordnung eines Fehlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FehlerKategorie {
    /// Mikrofon verweigert oder nicht verfuegbar
    Berechtigung,
    /// Socket konnte nicht geoeffnet/beschrieben werden oder wurde geschlossen
    Transport,
    /// Beschreibung oder Kandidat wurde von der Peer-Verbindung abgelehnt
    Aushandlung,
    /// Raum hat bereits zwei Teilnehmer
    Kapazitaet,
    /// Gegenstelle hat den Raum verlassen
    PeerGegangen,
    /// Bedienfehler (leere Eingabe, Befehl im falschen Zustand)
    Bedienung,
}

/// Alle moeglichen Fehler einer Ducktunnel-Sitzung
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DucktunnelError {
    // --- Geraete ---
    #[error("Mikrofonzugriff fehlgeschlagen: {0}")]
    Berechtigung(String),

    // --- Verbindung ---
    #[error("Signaling-Verbindung fehlgeschlagen: {0}")]
    Transport(String),

    #[error("Signaling-Verbindung verloren")]
    VerbindungVerloren,

    // --- Aushandlung ---
    #[error("Aushandlung fehlgeschlagen ({schritt}): {grund}")]
    Aushandlung { schritt: &'static str, grund: String },

    // --- Raum ---
    #[error("Raum ist voll: maximal zwei Teilnehmer")]
    RaumVoll,

    #[error("Gegenstelle hat den Raum verlassen")]
    PeerGegangen,

    // --- Bedienung ---
    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Befehl '{befehl}' im Zustand '{zustand}' nicht erlaubt")]
    UngueltigerZustand {
        befehl: &'static str,
        zustand: &'static str,
    },

    #[error("Sitzung wurde beendet")]
    SitzungBeendet,
}

impl DucktunnelError {
    /// Erstellt einen Aushandlungsfehler fuer einen bestimmten Schritt
    pub fn aushandlung(schritt: &'static str, grund: impl std::fmt::Display) -> Self {
        Self::Aushandlung {
            schritt,
            grund: grund.to_string(),
        }
    }

    /// Ordnet den Fehler einer Kategorie zu
    pub fn kategorie(&self) -> FehlerKategorie {
        match self {
            Self::Berechtigung(_) => FehlerKategorie::Berechtigung,
            Self::Transport(_) | Self::VerbindungVerloren | Self::SitzungBeendet => {
                FehlerKategorie::Transport
            }
            Self::Aushandlung { .. } => FehlerKategorie::Aushandlung,
            Self::RaumVoll => FehlerKategorie::Kapazitaet,
            Self::PeerGegangen => FehlerKategorie::PeerGegangen,
            Self::UngueltigeEingabe(_) | Self::UngueltigerZustand { .. } => {
                FehlerKategorie::Bedienung
            }
        }
    }

    /// Gibt true zurueck wenn der Fehler die Sitzung nach `disconnected` zwingt
    ///
    /// Bedienfehler lassen den aktuellen Zustand unveraendert.
    pub fn erzwingt_trennung(&self) -> bool {
        self.kategorie() != FehlerKategorie::Bedienung
    }

    /// Meldung fuer die Oberflaeche
    pub fn nutzer_meldung(&self) -> String {
        match self {
            Self::Berechtigung(_) => {
                "Cannot access microphone. Please allow access and try again.".into()
            }
            Self::Transport(_) => "Failed to connect to server".into(),
            Self::VerbindungVerloren => "Connection lost".into(),
            Self::Aushandlung { schritt, .. } => format!("Failed to {schritt}"),
            Self::RaumVoll => "Room is full".into(),
            Self::PeerGegangen => "Your peer left the room".into(),
            Self::UngueltigeEingabe(meldung) => meldung.clone(),
            Self::UngueltigerZustand { befehl, zustand } => {
                format!("Cannot {befehl} while {zustand}")
            }
            Self::SitzungBeendet => "Session closed".into(),
        }
    }
}
