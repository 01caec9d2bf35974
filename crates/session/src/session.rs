//! Anruf-Sitzung – Zustandsautomat als Actor
//!
//! Eine Sitzung besitzt genau eine lokale Aufnahme, eine Peer-Verbindung und
//! einen Signaling-Socket. Alle Uebergaenge laufen in einem einzigen Task, der
//! die Ereignis-Queue nacheinander abarbeitet; zwei Ereignisse koennen sich
//! daher nie ueberlappen.
//!
//! ```text
//! disconnected --join--> connecting --Socket offen--> connected
//!      ^                     |                            |
//!      |        Aufnahme/Socket-Fehler          erster Remote-Track
//!      |                     v                            v
//!      +------- leave / peer-left / Socket-Ende ------ in-call
//! ```

use ducktunnel_core::{DucktunnelError, Result, RoomId};
use ducktunnel_protocol::{share_url, signaling_url, Incoming, RelayNotice, Signal};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

use crate::capability::{
    Candidate, Description, LocalMedia, MediaCapture, PeerConnection, PeerConnectionFactory,
    SignalingChannel, SignalingConnector,
};
use crate::config::SessionConfig;
use crate::event::{Befehl, Ereignis, EventSink, SessionEvent};
use crate::state::{CallState, HeldResources, SessionError, SessionSnapshot};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Plattform-Faehigkeiten, die eine Sitzung benutzt
#[derive(Clone)]
pub struct Collaborators {
    pub capture: Arc<dyn MediaCapture>,
    pub peers: Arc<dyn PeerConnectionFactory>,
    pub signaling: Arc<dyn SignalingConnector>,
}

// ---------------------------------------------------------------------------
// SessionResources
// ---------------------------------------------------------------------------

/// Exklusiv gehaltene Ressourcen einer verbundenen Sitzung
///
/// Der Drop gibt alles frei: erst den Socket, dann die Peer-Verbindung,
/// zuletzt die Aufnahme.
#[derive(Default)]
struct SessionResources {
    signaling: Option<Box<dyn SignalingChannel>>,
    peer: Option<Box<dyn PeerConnection>>,
    media: Option<Box<dyn LocalMedia>>,

    /// Remote-Description wurde mindestens einmal gesetzt
    remote_gesetzt: bool,
    /// Kandidaten, die vor der ersten Remote-Description eingetroffen sind
    wartende_kandidaten: Vec<Candidate>,
}

impl SessionResources {
    fn peer(&self) -> Result<&dyn PeerConnection> {
        self.peer.as_deref().ok_or(DucktunnelError::SitzungBeendet)
    }

    fn senden(&self, signal: &Signal) -> Result<()> {
        let kanal = self
            .signaling
            .as_deref()
            .ok_or(DucktunnelError::VerbindungVerloren)?;
        kanal
            .send(signal.to_json())
            .map_err(|e| DucktunnelError::Transport(e.to_string()))
    }

    /// Wendet einen empfangenen Kandidaten an oder puffert ihn, solange die
    /// Peer-Verbindung noch keine Remote-Description hat
    async fn kandidat_anwenden(&mut self, candidate: Candidate) -> Result<()> {
        if !self.remote_gesetzt {
            self.wartende_kandidaten.push(candidate);
            tracing::debug!(
                wartend = self.wartende_kandidaten.len(),
                "ICE-Kandidat vor Remote-Description gepuffert"
            );
            return Ok(());
        }
        self.peer()?
            .add_ice_candidate(candidate)
            .await
            .map_err(|e| DucktunnelError::aushandlung("add ICE candidate", e))
    }

    /// Setzt die Remote-Description und wendet danach gepufferte Kandidaten an
    async fn remote_description_setzen(
        &mut self,
        description: Description,
        schritt: &'static str,
    ) -> Result<()> {
        self.peer()?
            .set_remote_description(description)
            .await
            .map_err(|e| DucktunnelError::aushandlung(schritt, e))?;
        self.remote_gesetzt = true;

        let gepuffert = std::mem::take(&mut self.wartende_kandidaten);
        if !gepuffert.is_empty() {
            tracing::debug!(anzahl = gepuffert.len(), "Gepufferte ICE-Kandidaten werden angewendet");
        }
        for candidate in gepuffert {
            self.kandidat_anwenden(candidate).await?;
        }
        Ok(())
    }

    fn gehalten(&self) -> HeldResources {
        HeldResources {
            media: self.media.is_some(),
            peer: self.peer.is_some(),
            signaling: self.signaling.is_some(),
        }
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        if let Some(kanal) = self.signaling.take() {
            kanal.close();
        }
        if let Some(peer) = self.peer.take() {
            peer.close();
        }
        if let Some(mut media) = self.media.take() {
            media.stop();
        }
    }
}

// ---------------------------------------------------------------------------
// Sitzung (Actor-Zustand)
// ---------------------------------------------------------------------------

struct Sitzung {
    config: SessionConfig,
    collaborators: Collaborators,
    tx: mpsc::UnboundedSender<Ereignis>,
    snapshot_tx: watch::Sender<SessionSnapshot>,

    zustand: CallState,
    raum: Option<RoomId>,
    muted: bool,
    link_kopiert: bool,
    fehler: Option<DucktunnelError>,
    ressourcen: Option<SessionResources>,

    /// Erhoeht bei jedem Auf- und Abbau; aeltere Collaborator-Meldungen sind veraltet
    generation: u64,
    share_seq: u64,
}

impl Sitzung {
    async fn ausfuehren(mut self, mut rx: mpsc::UnboundedReceiver<Ereignis>) {
        while let Some(ereignis) = rx.recv().await {
            match ereignis {
                Ereignis::Befehl(befehl) => self.befehl(befehl).await,
                Ereignis::Collaborator { generation, event } => {
                    self.collaborator_ereignis(generation, event).await
                }
                Ereignis::ShareAckAbgelaufen { share_seq } => {
                    if share_seq == self.share_seq && self.link_kopiert {
                        self.link_kopiert = false;
                        self.veroeffentlichen();
                    }
                }
                Ereignis::Shutdown => break,
            }
        }

        self.abbauen(None);
        tracing::debug!("Sitzung beendet");
    }

    async fn befehl(&mut self, befehl: Befehl) {
        match befehl {
            Befehl::Join { room, antwort } => {
                let ergebnis = self.join(&room).await;
                self.befehl_abschliessen(&ergebnis);
                let _ = antwort.send(ergebnis);
            }
            Befehl::StartCall { antwort } => {
                let ergebnis = self.start_call().await;
                self.befehl_abschliessen(&ergebnis);
                let _ = antwort.send(ergebnis);
            }
            Befehl::ToggleMute { antwort } => {
                let ergebnis = self.toggle_mute();
                self.befehl_abschliessen(&ergebnis);
                let _ = antwort.send(ergebnis);
            }
            Befehl::ShareRoom { antwort } => {
                let ergebnis = self.share_room();
                self.befehl_abschliessen(&ergebnis);
                let _ = antwort.send(ergebnis);
            }
            Befehl::LeaveRoom { antwort } => {
                self.leave_room();
                let _ = antwort.send(Ok(()));
            }
            Befehl::Settle { antwort } => {
                let _ = antwort.send(Ok(self.snapshot_tx.borrow().clone()));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Befehle
    // -----------------------------------------------------------------------

    async fn join(&mut self, eingabe: &str) -> Result<()> {
        self.erlaubt("join", &[CallState::Disconnected])?;
        let raum = RoomId::parse(eingabe)
            .ok_or_else(|| DucktunnelError::UngueltigeEingabe("Please enter a room ID".into()))?;

        self.generation += 1;
        self.zustand = CallState::Connecting;
        self.raum = Some(raum.clone());
        self.fehler = None;
        self.veroeffentlichen();
        tracing::info!(raum = %raum, "Raum wird betreten");

        let ressourcen = self.aufbauen(&raum).await?;
        self.ressourcen = Some(ressourcen);
        self.zustand = CallState::Connected;
        self.veroeffentlichen();
        tracing::info!(raum = %raum, "Mit Relay verbunden");
        Ok(())
    }

    /// Aufnahme, Socket, Peer-Verbindung in dieser Reihenfolge
    ///
    /// Bei einem Fehler gibt der Drop von `ressourcen` alles bereits
    /// Erworbene wieder frei.
    async fn aufbauen(&self, raum: &RoomId) -> Result<SessionResources> {
        let mut ressourcen = SessionResources::default();

        let media = self
            .collaborators
            .capture
            .acquire(&self.config.audio)
            .await
            .map_err(|e| DucktunnelError::Berechtigung(e.to_string()))?;
        ressourcen.media = Some(media);

        let url = signaling_url(&self.config.signaling_endpoint, raum)
            .map_err(|e| DucktunnelError::Transport(e.to_string()))?;
        let kanal = self
            .collaborators
            .signaling
            .connect(&url, self.sink())
            .await
            .map_err(|e| DucktunnelError::Transport(format!("{e:#}")))?;
        ressourcen.signaling = Some(kanal);

        let media = ressourcen
            .media
            .as_deref()
            .ok_or(DucktunnelError::SitzungBeendet)?;
        let peer = self
            .collaborators
            .peers
            .create(&self.config.ice_servers, media, self.sink())
            .await
            .map_err(|e| DucktunnelError::aushandlung("create peer connection", e))?;
        ressourcen.peer = Some(peer);

        Ok(ressourcen)
    }

    async fn start_call(&mut self) -> Result<()> {
        self.erlaubt("start call", &[CallState::Connected])?;
        self.angebot_senden().await?;
        tracing::info!(raum = ?self.raum, "Offer gesendet");
        Ok(())
    }

    fn toggle_mute(&mut self) -> Result<bool> {
        self.erlaubt("toggle mute", &[CallState::InCall])?;
        let media = self
            .ressourcen
            .as_mut()
            .and_then(|r| r.media.as_mut())
            .ok_or(DucktunnelError::SitzungBeendet)?;

        let aktiv = !media.is_enabled();
        media.set_enabled(aktiv);
        self.muted = !aktiv;
        self.veroeffentlichen();
        tracing::debug!(muted = self.muted, "Mikrofon umgeschaltet");
        Ok(self.muted)
    }

    fn share_room(&mut self) -> Result<String> {
        self.erlaubt("share room", &[CallState::InCall])?;
        let raum = self.raum.as_ref().ok_or(DucktunnelError::SitzungBeendet)?;
        let link = share_url(&self.config.share_origin, raum);

        self.link_kopiert = true;
        self.share_seq += 1;
        let share_seq = self.share_seq;
        let tx = self.tx.clone();
        let dauer = self.config.share_ack();
        tokio::spawn(async move {
            tokio::time::sleep(dauer).await;
            let _ = tx.send(Ereignis::ShareAckAbgelaufen { share_seq });
        });

        self.veroeffentlichen();
        Ok(link)
    }

    fn leave_room(&mut self) {
        if self.zustand != CallState::Disconnected {
            tracing::info!(raum = ?self.raum, "Raum verlassen");
        }
        self.abbauen(None);
    }

    // -----------------------------------------------------------------------
    // Collaborator-Ereignisse
    // -----------------------------------------------------------------------

    async fn collaborator_ereignis(&mut self, generation: u64, event: SessionEvent) {
        if generation != self.generation || self.ressourcen.is_none() {
            tracing::trace!(generation, aktuell = self.generation, "Veraltetes Ereignis verworfen");
            return;
        }

        let ergebnis = match event {
            SessionEvent::SignalText(text) => self.signal_verarbeiten(&text).await,
            SessionEvent::LocalCandidate(candidate) => self
                .ressourcen
                .as_ref()
                .ok_or(DucktunnelError::SitzungBeendet)
                .and_then(|r| r.senden(&Signal::Candidate { candidate })),
            SessionEvent::RemoteTrack => {
                if self.zustand == CallState::Connected {
                    self.zustand = CallState::InCall;
                    self.veroeffentlichen();
                    tracing::info!(raum = ?self.raum, "Remote-Track eingetroffen – Anruf laeuft");
                }
                Ok(())
            }
            SessionEvent::SignalingClosed => Err(DucktunnelError::VerbindungVerloren),
            SessionEvent::SignalingError(grund) => Err(DucktunnelError::Transport(grund)),
        };

        if let Err(e) = ergebnis {
            self.fehler_melden(e);
        }
    }

    async fn signal_verarbeiten(&mut self, text: &str) -> Result<()> {
        let nachricht = match Incoming::parse(text) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(fehler = %e, "Unbekannte Signaling-Nachricht ignoriert");
                return Ok(());
            }
        };

        if let Incoming::Signal(signal) = &nachricht {
            tracing::debug!(art = %signal.kind(), zustand = %self.zustand, "Signal empfangen");
        }

        let ressourcen = self
            .ressourcen
            .as_mut()
            .ok_or(DucktunnelError::SitzungBeendet)?;

        match nachricht {
            Incoming::Notice(RelayNotice::PeerLeft) => Err(DucktunnelError::PeerGegangen),
            Incoming::Notice(RelayNotice::RoomFull) => Err(DucktunnelError::RaumVoll),
            Incoming::Signal(Signal::Offer { offer }) => {
                angebot_beantworten(ressourcen, offer).await
            }
            Incoming::Signal(Signal::Answer { answer }) => {
                ressourcen
                    .remote_description_setzen(answer, "handle answer")
                    .await
            }
            Incoming::Signal(Signal::Candidate { candidate }) => {
                ressourcen.kandidat_anwenden(candidate).await
            }
        }
    }

    async fn angebot_senden(&self) -> Result<()> {
        let ressourcen = self
            .ressourcen
            .as_ref()
            .ok_or(DucktunnelError::SitzungBeendet)?;
        let peer = ressourcen.peer()?;

        let offer = peer
            .create_offer()
            .await
            .map_err(|e| DucktunnelError::aushandlung("start call", e))?;
        peer.set_local_description(offer.clone())
            .await
            .map_err(|e| DucktunnelError::aushandlung("start call", e))?;
        ressourcen.senden(&Signal::Offer { offer })
    }

    // -----------------------------------------------------------------------
    // Hilfsfunktionen
    // -----------------------------------------------------------------------

    fn erlaubt(&self, befehl: &'static str, zustaende: &[CallState]) -> Result<()> {
        if zustaende.contains(&self.zustand) {
            Ok(())
        } else {
            Err(DucktunnelError::UngueltigerZustand {
                befehl,
                zustand: self.zustand.as_str(),
            })
        }
    }

    fn sink(&self) -> EventSink {
        EventSink::neu(self.generation, self.tx.clone())
    }

    fn befehl_abschliessen<T>(&mut self, ergebnis: &Result<T>) {
        if let Err(e) = ergebnis {
            self.fehler_melden(e.clone());
        }
    }

    /// Trennt bei Fehlern, die die Sitzung beenden; Bedienfehler aendern
    /// den Zustand nicht
    fn fehler_melden(&mut self, fehler: DucktunnelError) {
        if fehler.erzwingt_trennung() {
            self.abbauen(Some(fehler));
        } else {
            tracing::debug!(fehler = %fehler, "Bedienfehler, Zustand bleibt");
        }
    }

    /// Gibt alle Ressourcen frei und kehrt nach `disconnected` zurueck
    ///
    /// Ohne Fehler (explizites Verlassen) wird auch die letzte Fehlermeldung
    /// geloescht. Mehrfacher Aufruf ist harmlos.
    fn abbauen(&mut self, fehler: Option<DucktunnelError>) {
        drop(self.ressourcen.take());
        self.generation += 1;
        self.zustand = CallState::Disconnected;
        self.raum = None;
        self.muted = false;
        self.link_kopiert = false;

        if let Some(e) = &fehler {
            tracing::warn!(
                kategorie = ?e.kategorie(),
                fehler = %e,
                "Sitzung getrennt"
            );
        }
        self.fehler = fehler;
        self.veroeffentlichen();
    }

    fn veroeffentlichen(&self) {
        let snapshot = SessionSnapshot {
            state: self.zustand,
            room: self.raum.clone(),
            muted: self.muted,
            link_kopiert: self.link_kopiert,
            error: self.fehler.as_ref().map(SessionError::from),
            resources: self
                .ressourcen
                .as_ref()
                .map(SessionResources::gehalten)
                .unwrap_or_default(),
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}

/// Antwortet auf ein Offer; auch im Anruf (Neuverhandlung auf derselben Verbindung)
async fn angebot_beantworten(ressourcen: &mut SessionResources, offer: Description) -> Result<()> {
    ressourcen
        .remote_description_setzen(offer, "handle offer")
        .await?;
    let peer = ressourcen.peer()?;
    let answer = peer
        .create_answer()
        .await
        .map_err(|e| DucktunnelError::aushandlung("handle offer", e))?;
    peer.set_local_description(answer.clone())
        .await
        .map_err(|e| DucktunnelError::aushandlung("handle offer", e))?;
    ressourcen.senden(&Signal::Answer { answer })
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle auf eine laufende Sitzung
///
/// Clone teilt die Sitzung. Wird der letzte Handle verworfen, baut die
/// Sitzung alles ab und beendet ihren Task.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    tx: mpsc::UnboundedSender<Ereignis>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        let _ = self.tx.send(Ereignis::Shutdown);
    }
}

impl SessionHandle {
    /// Startet eine neue Sitzung im Zustand `disconnected`
    ///
    /// Muss innerhalb einer tokio-Runtime aufgerufen werden.
    pub fn spawn(config: SessionConfig, collaborators: Collaborators) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let sitzung = Sitzung {
            config,
            collaborators,
            tx: tx.clone(),
            snapshot_tx,
            zustand: CallState::Disconnected,
            raum: None,
            muted: false,
            link_kopiert: false,
            fehler: None,
            ressourcen: None,
            generation: 0,
            share_seq: 0,
        };
        tokio::spawn(sitzung.ausfuehren(rx));

        Self {
            inner: Arc::new(HandleInner { tx, snapshot_rx }),
        }
    }

    /// Betritt einen Raum: Aufnahme, Socket, Peer-Verbindung
    ///
    /// Kehrt im Zustand `connected` zurueck. Ist der Raum voll, meldet der
    /// Relay das erst nach dem Verbindungsaufbau; die Sitzung faellt dann
    /// mit `RaumVoll` nach `disconnected` zurueck.
    pub async fn join(&self, room: &str) -> Result<()> {
        let room = room.to_string();
        self.anfrage(|antwort| Befehl::Join { room, antwort }).await
    }

    /// Erstellt ein Offer und sendet es an den Peer
    pub async fn start_call(&self) -> Result<()> {
        self.anfrage(|antwort| Befehl::StartCall { antwort }).await
    }

    /// Schaltet das Mikrofon um; gibt den neuen Mute-Status zurueck
    pub async fn toggle_mute(&self) -> Result<bool> {
        self.anfrage(|antwort| Befehl::ToggleMute { antwort }).await
    }

    /// Gibt den teilbaren Raum-Link zurueck und setzt `link_kopiert`
    pub async fn share_room(&self) -> Result<String> {
        self.anfrage(|antwort| Befehl::ShareRoom { antwort }).await
    }

    /// Verlaesst den Raum; in jedem Zustand erlaubt
    pub async fn leave_room(&self) -> Result<()> {
        self.anfrage(|antwort| Befehl::LeaveRoom { antwort }).await
    }

    /// Wartet bis alle zuvor eingereihten Ereignisse verarbeitet sind
    pub async fn settle(&self) -> Result<SessionSnapshot> {
        self.anfrage(|antwort| Befehl::Settle { antwort }).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot_rx.clone()
    }

    /// Wartet bis ein Snapshot `bedingung` erfuellt
    pub async fn wait_for(
        &self,
        bedingung: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot> {
        let mut rx = self.subscribe();
        let snapshot = rx
            .wait_for(bedingung)
            .await
            .map_err(|_| DucktunnelError::SitzungBeendet)?;
        Ok(snapshot.clone())
    }

    async fn anfrage<T>(
        &self,
        bauen: impl FnOnce(oneshot::Sender<Result<T>>) -> Befehl,
    ) -> Result<T> {
        let (antwort_tx, antwort_rx) = oneshot::channel();
        self.inner
            .tx
            .send(Ereignis::Befehl(bauen(antwort_tx)))
            .map_err(|_| DucktunnelError::SitzungBeendet)?;
        antwort_rx
            .await
            .map_err(|_| DucktunnelError::SitzungBeendet)?
    }
}
