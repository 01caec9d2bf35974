//! Schnittstellen zu den Plattform-Faehigkeiten
//!
//! Die Sitzung treibt Mikrofon, Peer-Verbindung und Signaling-Socket nur
//! ueber diese Traits. Implementierungen liefern `anyhow`-Fehler; die
//! Sitzung ordnet sie der Fehler-Taxonomie zu.
//!
//! Asynchrone Ereignisse (ICE-Kandidaten, Remote-Track, eingehende Frames,
//! Socket-Ende) melden Implementierungen ueber den uebergebenen
//! [`EventSink`]; sie landen in der Ereignis-Queue der Sitzung.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::config::AudioConstraints;
use crate::event::EventSink;

/// Session-Description (SDP-Objekt), fuer die Sitzung undurchsichtig
pub type Description = Value;

/// ICE-Kandidat, fuer die Sitzung undurchsichtig
pub type Candidate = Value;

/// Zugriff auf das lokale Mikrofon
#[async_trait]
pub trait MediaCapture: Send + Sync {
    /// Fordert eine Audio-Aufnahme an; Fehler bedeutet verweigert oder nicht vorhanden
    async fn acquire(&self, constraints: &AudioConstraints) -> anyhow::Result<Box<dyn LocalMedia>>;
}

/// Eine laufende lokale Audio-Aufnahme
pub trait LocalMedia: Send + Sync {
    fn set_enabled(&mut self, enabled: bool);
    fn is_enabled(&self) -> bool;
    /// Beendet die Aufnahme; mehrfacher Aufruf ist erlaubt
    fn stop(&mut self);
}

/// Erzeugt Peer-Verbindungen
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    /// Erstellt eine Peer-Verbindung, an die die lokale Aufnahme gebunden ist
    ///
    /// `events` empfaengt `LocalCandidate` und `RemoteTrack`.
    async fn create(
        &self,
        ice_servers: &[String],
        media: &dyn LocalMedia,
        events: EventSink,
    ) -> anyhow::Result<Box<dyn PeerConnection>>;
}

/// Eine Peer-Verbindung (Offer/Answer, ICE)
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> anyhow::Result<Description>;
    async fn create_answer(&self) -> anyhow::Result<Description>;
    async fn set_local_description(&self, description: Description) -> anyhow::Result<()>;
    async fn set_remote_description(&self, description: Description) -> anyhow::Result<()>;
    async fn add_ice_candidate(&self, candidate: Candidate) -> anyhow::Result<()>;
    fn close(&self);
}

/// Baut Signaling-Verbindungen zum Relay auf
#[async_trait]
pub trait SignalingConnector: Send + Sync {
    /// Oeffnet den Socket; kehrt erst zurueck wenn er offen ist
    ///
    /// `events` empfaengt `SignalText`, `SignalingClosed` und `SignalingError`.
    async fn connect(&self, url: &Url, events: EventSink)
        -> anyhow::Result<Box<dyn SignalingChannel>>;
}

/// Ein offener Signaling-Socket
pub trait SignalingChannel: Send + Sync {
    /// Reiht einen Text-Frame zum Senden ein
    fn send(&self, text: String) -> anyhow::Result<()>;
    fn close(&self);
}
