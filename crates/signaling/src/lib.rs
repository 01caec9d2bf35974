//! ducktunnel-signaling – WebSocket-Relay fuer Zwei-Personen-Raeume
//!
//! Der Relay paart hoechstens zwei Verbindungen pro Raum und leitet jeden
//! Text-Frame unveraendert an den jeweils anderen Teilnehmer weiter. Er
//! kennt keine Nachrichtentypen und speichert nichts.
//!
//! ## Architektur
//!
//! ```text
//! axum Router (relay_router)
//!     |  GET /ws?room=<id>  ->  WebSocket-Upgrade
//!     v
//! PeerVerbindung (pro Verbindung ein Task)
//!     |  beitreten -> Belegung (verlaesst den Raum beim Drop)
//!     v
//! RaumRegistry
//!     DashMap<RoomId, Arc<Mutex<Raum>>>
//!     Raum: bis zu zwei PeerSender (unbegrenzte mpsc-Queues)
//! ```

pub mod connection;
pub mod error;
pub mod raum;
pub mod registry;
pub mod server;

// Bequeme Re-Exporte
pub use connection::PeerVerbindung;
pub use error::{SignalingError, SignalingResult};
pub use raum::{Ausgehend, PeerSender, MAX_TEILNEHMER};
pub use registry::{Belegung, RaumRegistry};
pub use server::{
    auf_shutdown_warten, relay_router, RelayConfig, RelayState, SignalingServer,
    STANDARD_MAX_NACHRICHT_BYTES, STANDARD_PFAD,
};
