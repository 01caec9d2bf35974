//! Beobachtbarer Zustand einer Sitzung

use ducktunnel_core::{DucktunnelError, FehlerKategorie, RoomId};
use serde::Serialize;

/// Phase einer Anruf-Sitzung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    InCall,
}

impl CallState {
    pub fn as_str(self) -> &'static str {
        match self {
            CallState::Disconnected => "disconnected",
            CallState::Connecting => "connecting",
            CallState::Connected => "connected",
            CallState::InCall => "in-call",
        }
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zuletzt aufgetretener Fehler, wie er angezeigt wird
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionError {
    pub kategorie: FehlerKategorie,
    pub meldung: String,
}

impl From<&DucktunnelError> for SessionError {
    fn from(e: &DucktunnelError) -> Self {
        Self {
            kategorie: e.kategorie(),
            meldung: e.nutzer_meldung(),
        }
    }
}

/// Welche exklusiven Ressourcen die Sitzung gerade haelt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HeldResources {
    pub media: bool,
    pub peer: bool,
    pub signaling: bool,
}

impl HeldResources {
    pub fn keine(&self) -> bool {
        !self.media && !self.peer && !self.signaling
    }
}

/// Momentaufnahme der Sitzung, per `watch` veroeffentlicht
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionSnapshot {
    pub state: CallState,
    pub room: Option<RoomId>,
    pub muted: bool,
    pub link_kopiert: bool,
    pub error: Option<SessionError>,
    pub resources: HeldResources,
}
