//! Test-Doubles fuer Mikrofon, Peer-Verbindung und Signaling
#![allow(dead_code)]

use async_trait::async_trait;
use ducktunnel_session::{
    AudioConstraints, Candidate, Collaborators, Description, EventSink, LocalMedia, MediaCapture,
    PeerConnection, PeerConnectionFactory, SessionConfig, SessionEvent, SessionHandle,
    SignalingChannel, SignalingConnector, WebSocketConnector,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Gemeinsames Protokoll aller Collaborator-Aufrufe einer Sitzung
#[derive(Clone, Default)]
pub struct Protokoll(Arc<Mutex<Vec<String>>>);

impl Protokoll {
    pub fn eintragen(&self, eintrag: impl Into<String>) {
        self.0.lock().push(eintrag.into());
    }

    pub fn eintraege(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn enthaelt(&self, eintrag: &str) -> bool {
        self.0.lock().iter().any(|e| e == eintrag)
    }

    pub fn anzahl(&self, eintrag: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == eintrag).count()
    }

    /// Position des letzten Vorkommens
    pub fn position(&self, eintrag: &str) -> Option<usize> {
        self.0.lock().iter().rposition(|e| e == eintrag)
    }

    /// Wartet bis ein Eintrag erscheint (fuer Tests mit echtem Relay)
    pub async fn warten_auf(&self, eintrag: &str) {
        for _ in 0..200 {
            if self.enthaelt(eintrag) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("'{eintrag}' nie protokolliert: {:?}", self.eintraege());
    }
}

/// Welche Schritte fehlschlagen sollen
#[derive(Clone, Copy, Default)]
pub struct Fehlerplan {
    pub capture_verweigert: bool,
    pub connect_fehlschlag: bool,
    pub remote_description_fehlschlag: bool,
}

// ---------------------------------------------------------------------------
// Mikrofon
// ---------------------------------------------------------------------------

pub struct FakeCapture {
    log: Protokoll,
    plan: Fehlerplan,
}

#[async_trait]
impl MediaCapture for FakeCapture {
    async fn acquire(&self, _c: &AudioConstraints) -> anyhow::Result<Box<dyn LocalMedia>> {
        self.log.eintragen("capture.acquire");
        if self.plan.capture_verweigert {
            anyhow::bail!("NotAllowedError: Permission denied");
        }
        Ok(Box::new(FakeMedia {
            log: self.log.clone(),
            enabled: true,
        }))
    }
}

pub struct FakeMedia {
    log: Protokoll,
    enabled: bool,
}

impl LocalMedia for FakeMedia {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.log.eintragen(format!("media.enabled={enabled}"));
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn stop(&mut self) {
        self.log.eintragen("media.stop");
    }
}

// ---------------------------------------------------------------------------
// Peer-Verbindung
// ---------------------------------------------------------------------------

pub struct FakePeers {
    log: Protokoll,
    plan: Fehlerplan,
    sinks: Arc<Mutex<Vec<EventSink>>>,
}

#[async_trait]
impl PeerConnectionFactory for FakePeers {
    async fn create(
        &self,
        _ice: &[String],
        media: &dyn LocalMedia,
        events: EventSink,
    ) -> anyhow::Result<Box<dyn PeerConnection>> {
        assert!(media.is_enabled(), "Peer wird mit aktiver Aufnahme erstellt");
        self.log.eintragen("peer.create");
        self.sinks.lock().push(events);
        Ok(Box::new(FakePeer {
            log: self.log.clone(),
            plan: self.plan,
            remote_gesetzt: AtomicBool::new(false),
        }))
    }
}

/// Verhaelt sich wie eine echte Peer-Verbindung: Kandidaten vor der ersten
/// Remote-Description werden abgelehnt
pub struct FakePeer {
    log: Protokoll,
    plan: Fehlerplan,
    remote_gesetzt: AtomicBool,
}

fn art(d: &Description) -> String {
    d.get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("?")
        .to_string()
}

#[async_trait]
impl PeerConnection for FakePeer {
    async fn create_offer(&self) -> anyhow::Result<Description> {
        Ok(json!({"type": "offer", "sdp": "v=0 fake-offer"}))
    }

    async fn create_answer(&self) -> anyhow::Result<Description> {
        Ok(json!({"type": "answer", "sdp": "v=0 fake-answer"}))
    }

    async fn set_local_description(&self, d: Description) -> anyhow::Result<()> {
        self.log.eintragen(format!("peer.local:{}", art(&d)));
        Ok(())
    }

    async fn set_remote_description(&self, d: Description) -> anyhow::Result<()> {
        if self.plan.remote_description_fehlschlag {
            anyhow::bail!("InvalidStateError");
        }
        self.remote_gesetzt.store(true, Ordering::SeqCst);
        self.log.eintragen(format!("peer.remote:{}", art(&d)));
        Ok(())
    }

    async fn add_ice_candidate(&self, c: Candidate) -> anyhow::Result<()> {
        if !self.remote_gesetzt.load(Ordering::SeqCst) {
            anyhow::bail!("InvalidStateError: remote description is null");
        }
        self.log.eintragen(format!("peer.candidate:{c}"));
        Ok(())
    }

    fn close(&self) {
        self.log.eintragen("peer.close");
    }
}

// ---------------------------------------------------------------------------
// Signaling
// ---------------------------------------------------------------------------

pub struct FakeSignaling {
    log: Protokoll,
    plan: Fehlerplan,
    gesendet: Arc<Mutex<Vec<String>>>,
    sinks: Arc<Mutex<Vec<EventSink>>>,
}

#[async_trait]
impl SignalingConnector for FakeSignaling {
    async fn connect(
        &self,
        url: &Url,
        events: EventSink,
    ) -> anyhow::Result<Box<dyn SignalingChannel>> {
        self.log.eintragen(format!("signaling.connect:{url}"));
        if self.plan.connect_fehlschlag {
            anyhow::bail!("connection refused");
        }
        self.sinks.lock().push(events);
        Ok(Box::new(FakeChannel {
            log: self.log.clone(),
            gesendet: Arc::clone(&self.gesendet),
        }))
    }
}

pub struct FakeChannel {
    log: Protokoll,
    gesendet: Arc<Mutex<Vec<String>>>,
}

impl SignalingChannel for FakeChannel {
    fn send(&self, text: String) -> anyhow::Result<()> {
        self.gesendet.lock().push(text);
        Ok(())
    }

    fn close(&self) {
        self.log.eintragen("signaling.close");
    }
}

// ---------------------------------------------------------------------------
// Umgebung
// ---------------------------------------------------------------------------

/// Sitzung mit Fakes und Zugriff auf deren Rueckkanaele
pub struct Umgebung {
    pub handle: SessionHandle,
    pub log: Protokoll,
    pub gesendet: Arc<Mutex<Vec<String>>>,
    pub peer_sinks: Arc<Mutex<Vec<EventSink>>>,
    pub signaling_sinks: Arc<Mutex<Vec<EventSink>>>,
}

impl Umgebung {
    pub fn neu() -> Self {
        Self::mit_plan(Fehlerplan::default())
    }

    pub fn mit_plan(plan: Fehlerplan) -> Self {
        Self::mit(SessionConfig::default(), plan)
    }

    pub fn mit(config: SessionConfig, plan: Fehlerplan) -> Self {
        Self::bauen(config, plan, None)
    }

    /// Echter WebSocket-Transport statt Fake-Signaling
    pub fn mit_relay(endpoint: &str) -> Self {
        let config = SessionConfig {
            signaling_endpoint: endpoint.to_string(),
            ..SessionConfig::default()
        };
        Self::bauen(
            config,
            Fehlerplan::default(),
            Some(Arc::new(WebSocketConnector::new())),
        )
    }

    fn bauen(
        config: SessionConfig,
        plan: Fehlerplan,
        connector: Option<Arc<dyn SignalingConnector>>,
    ) -> Self {
        let log = Protokoll::default();
        let gesendet = Arc::new(Mutex::new(Vec::new()));
        let peer_sinks = Arc::new(Mutex::new(Vec::new()));
        let signaling_sinks = Arc::new(Mutex::new(Vec::new()));

        let signaling = connector.unwrap_or_else(|| {
            Arc::new(FakeSignaling {
                log: log.clone(),
                plan,
                gesendet: Arc::clone(&gesendet),
                sinks: Arc::clone(&signaling_sinks),
            })
        });

        let collaborators = Collaborators {
            capture: Arc::new(FakeCapture {
                log: log.clone(),
                plan,
            }),
            peers: Arc::new(FakePeers {
                log: log.clone(),
                plan,
                sinks: Arc::clone(&peer_sinks),
            }),
            signaling,
        };

        Self {
            handle: SessionHandle::spawn(config, collaborators),
            log,
            gesendet,
            peer_sinks,
            signaling_sinks,
        }
    }

    /// Simuliert einen Text-Frame vom Relay
    pub fn relay_sendet(&self, text: &str) {
        self.letzter_signaling_sink()
            .emit(SessionEvent::SignalText(text.to_string()));
    }

    pub fn relay_schliesst(&self) {
        self.letzter_signaling_sink()
            .emit(SessionEvent::SignalingClosed);
    }

    pub fn remote_track(&self) {
        self.letzter_peer_sink().emit(SessionEvent::RemoteTrack);
    }

    pub fn lokaler_kandidat(&self, c: serde_json::Value) {
        self.letzter_peer_sink()
            .emit(SessionEvent::LocalCandidate(c));
    }

    pub fn letzter_peer_sink(&self) -> EventSink {
        self.peer_sinks
            .lock()
            .last()
            .cloned()
            .expect("keine Peer-Verbindung erstellt")
    }

    pub fn letzter_signaling_sink(&self) -> EventSink {
        self.signaling_sinks
            .lock()
            .last()
            .cloned()
            .expect("kein Signaling-Socket geoeffnet")
    }

    pub fn gesendet(&self) -> Vec<String> {
        self.gesendet.lock().clone()
    }

    /// Beitreten und per Remote-Track in den Anruf wechseln
    pub async fn im_anruf(&self, raum: &str) {
        self.handle.join(raum).await.unwrap();
        self.remote_track();
        let s = self.handle.settle().await.unwrap();
        assert_eq!(s.state, ducktunnel_session::CallState::InCall);
    }
}
