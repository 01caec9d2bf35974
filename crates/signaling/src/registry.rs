//! Raum-Registry – Wer ist in welchem Raum?
//!
//! Haelt alle belegten Raeume des Relays. Beitritt und Abgang laufen unter
//! dem DashMap-Eintrag (Shard-Lock) und danach dem Raum-Mutex; Weiterleitung
//! klont den Raum-`Arc`, gibt den Shard frei und sperrt nur den Raum. Die
//! Sperrreihenfolge ist damit immer Shard vor Raum.
//!
//! Ein leer gewordener Raum wird sofort entfernt. Ein spaeterer Beitritt mit
//! derselben ID beginnt einen frischen Raum.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ducktunnel_core::{ConnectionId, RoomId};
use ducktunnel_observability::RelayMetriken;
use ducktunnel_protocol::RelayNotice;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::SignalingResult;
use crate::raum::{Ausgehend, PeerSender, Raum, MAX_TEILNEHMER};

// ---------------------------------------------------------------------------
// RaumRegistry
// ---------------------------------------------------------------------------

/// Registry aller belegten Raeume
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct RaumRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    raeume: DashMap<RoomId, Arc<Mutex<Raum>>>,
    metriken: RelayMetriken,
}

impl RaumRegistry {
    /// Erstellt eine leere Registry
    pub fn neu(metriken: RelayMetriken) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                raeume: DashMap::new(),
                metriken,
            }),
        }
    }

    /// Laesst eine Verbindung einem Raum beitreten
    ///
    /// Schlaegt mit `RaumVoll` fehl wenn der Raum bereits zwei Teilnehmer
    /// hat; die bestehenden Teilnehmer bleiben davon unberuehrt. Die
    /// zurueckgegebene `Belegung` verlaesst den Raum beim Drop.
    pub fn beitreten(&self, raum_id: RoomId, sender: PeerSender) -> SignalingResult<Belegung> {
        let verbindung = sender.verbindung;

        let (war_leer, anzahl) = {
            let eintrag = self
                .inner
                .raeume
                .entry(raum_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Raum::neu(raum_id.clone()))));
            let mut raum = eintrag.value().lock();
            let war_leer = raum.ist_leer();

            if let Err(e) = raum.aufnehmen(sender) {
                self.inner.metriken.joins_rejected_total.inc();
                tracing::warn!(
                    raum = %raum_id,
                    verbindung = %verbindung,
                    "Beitritt abgelehnt: Raum ist voll"
                );
                return Err(e);
            }
            (war_leer, raum.anzahl())
        };

        if war_leer {
            self.inner.metriken.rooms_active.inc();
        }
        self.inner.metriken.connected_peers.inc();

        tracing::info!(
            raum = %raum_id,
            verbindung = %verbindung,
            teilnehmer = anzahl,
            gepaart = anzahl == MAX_TEILNEHMER,
            "Raum beigetreten"
        );

        Ok(Belegung {
            registry: self.clone(),
            raum: raum_id,
            verbindung,
        })
    }

    /// Leitet einen Text-Frame an den anderen Teilnehmer weiter
    ///
    /// Ohne Peer (oder wenn `von` nicht im Raum ist) wird der Frame still
    /// verworfen und `false` zurueckgegeben. Ein spaeter beitretender Peer
    /// bekommt verworfene Frames nie zu sehen.
    pub fn weiterleiten(&self, raum_id: &RoomId, von: ConnectionId, text: String) -> bool {
        let raum = match self.inner.raeume.get(raum_id) {
            Some(eintrag) => Arc::clone(eintrag.value()),
            None => {
                self.inner.metriken.signals_dropped_total.inc();
                return false;
            }
        };

        let zugestellt = {
            let raum = raum.lock();
            match raum.gegenueber(von) {
                Some(peer) => peer.senden(Ausgehend::Signal(text)),
                None => false,
            }
        };

        if zugestellt {
            self.inner.metriken.signals_relayed_total.inc();
            tracing::trace!(raum = %raum_id, von = %von, "Frame weitergeleitet");
        } else {
            self.inner.metriken.signals_dropped_total.inc();
            tracing::debug!(raum = %raum_id, von = %von, "Frame verworfen: kein Peer im Raum");
        }
        zugestellt
    }

    /// Entfernt eine Verbindung aus ihrem Raum
    ///
    /// Der verbleibende Teilnehmer bekommt `peer-left`, eingereiht unter dem
    /// Raum-Lock und damit nach allen zuvor weitergeleiteten Frames.
    fn verlassen(&self, raum_id: &RoomId, verbindung: ConnectionId) {
        let mut entfernt = false;
        let mut benachrichtigt = false;
        let mut raum_geloescht = false;

        if let Entry::Occupied(eintrag) = self.inner.raeume.entry(raum_id.clone()) {
            let leer = {
                let mut raum = eintrag.get().lock();
                entfernt = raum.entfernen(verbindung);
                if entfernt {
                    if let Some(peer) = raum.erster() {
                        benachrichtigt = peer.senden(Ausgehend::Hinweis(RelayNotice::PeerLeft));
                    }
                }
                raum.ist_leer()
            };
            if leer {
                eintrag.remove();
                raum_geloescht = true;
            }
        }

        if !entfernt {
            return;
        }

        self.inner.metriken.connected_peers.dec();
        if raum_geloescht {
            self.inner.metriken.rooms_active.dec();
        }
        if benachrichtigt {
            self.inner.metriken.peer_departures_total.inc();
        }

        tracing::info!(
            raum = %raum_id,
            verbindung = %verbindung,
            peer_benachrichtigt = benachrichtigt,
            raum_geloescht,
            "Raum verlassen"
        );
    }

    /// Anzahl Teilnehmer in einem Raum (0 wenn der Raum nicht existiert)
    pub fn teilnehmer_anzahl(&self, raum_id: &RoomId) -> usize {
        self.inner
            .raeume
            .get(raum_id)
            .map(|eintrag| eintrag.value().lock().anzahl())
            .unwrap_or(0)
    }

    /// Anzahl belegter Raeume
    pub fn raum_anzahl(&self) -> usize {
        self.inner.raeume.len()
    }

    /// Gibt die Metriken der Registry zurueck
    pub fn metriken(&self) -> &RelayMetriken {
        &self.inner.metriken
    }
}

// ---------------------------------------------------------------------------
// Belegung
// ---------------------------------------------------------------------------

/// Platz einer Verbindung in einem Raum
///
/// Solange die Belegung lebt, zaehlt die Verbindung als Teilnehmer. Der Drop
/// gibt den Platz frei, auf jedem Weg aus dem Verbindungs-Task heraus.
pub struct Belegung {
    registry: RaumRegistry,
    raum: RoomId,
    verbindung: ConnectionId,
}

impl Belegung {
    pub fn raum(&self) -> &RoomId {
        &self.raum
    }

    pub fn verbindung(&self) -> ConnectionId {
        self.verbindung
    }

    /// Leitet einen Frame an den Peer weiter
    pub fn weiterleiten(&self, text: String) -> bool {
        self.registry.weiterleiten(&self.raum, self.verbindung, text)
    }
}

impl Drop for Belegung {
    fn drop(&mut self) {
        self.registry.verlassen(&self.raum, self.verbindung);
    }
}

impl std::fmt::Debug for Belegung {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Belegung")
            .field("raum", &self.raum)
            .field("verbindung", &self.verbindung)
            .finish()
    }
}
