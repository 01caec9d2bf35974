//! Zuletzt besuchte Raeume (lokale JSON-Datei)
//!
//! Neueste zuerst, ohne Duplikate, hoechstens [`MAX_RECENT_ROOMS`] Eintraege.
//! Eine fehlende oder beschaedigte Datei gilt als leer. Die Sitzung selbst
//! liest diese Liste nie.

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MAX_RECENT_ROOMS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRoom {
    pub name: String,
    /// Unix-Zeit in Millisekunden
    pub last_visited: i64,
}

/// Dateibasierte Liste der letzten Raeume
#[derive(Debug, Clone)]
pub struct RecentRooms {
    pfad: PathBuf,
}

impl RecentRooms {
    pub fn new(pfad: impl Into<PathBuf>) -> Self {
        Self { pfad: pfad.into() }
    }

    pub fn path(&self) -> &Path {
        &self.pfad
    }

    /// Laedt die Liste, neueste zuerst
    pub fn load(&self) -> Vec<RecentRoom> {
        let mut raeume = self.lesen();
        raeume.sort_by(|a, b| b.last_visited.cmp(&a.last_visited));
        raeume.truncate(MAX_RECENT_ROOMS);
        raeume
    }

    /// Vermerkt einen Besuch jetzt und gibt die neue Liste zurueck
    pub fn record(&self, name: &str) -> anyhow::Result<Vec<RecentRoom>> {
        self.record_at(name, Utc::now().timestamp_millis())
    }

    /// Vermerkt einen Besuch zum angegebenen Zeitpunkt
    pub fn record_at(&self, name: &str, last_visited: i64) -> anyhow::Result<Vec<RecentRoom>> {
        let mut raeume = vec![RecentRoom {
            name: name.to_string(),
            last_visited,
        }];
        raeume.extend(self.lesen().into_iter().filter(|r| r.name != name));
        raeume.truncate(MAX_RECENT_ROOMS);

        if let Some(verzeichnis) = self.pfad.parent() {
            if !verzeichnis.as_os_str().is_empty() {
                std::fs::create_dir_all(verzeichnis).with_context(|| {
                    format!("Verzeichnis {} konnte nicht angelegt werden", verzeichnis.display())
                })?;
            }
        }
        let json = serde_json::to_vec_pretty(&raeume)?;
        std::fs::write(&self.pfad, json)
            .with_context(|| format!("{} konnte nicht geschrieben werden", self.pfad.display()))?;

        tracing::debug!(raum = name, eintraege = raeume.len(), "Raum in Verlauf gespeichert");
        Ok(raeume)
    }

    fn lesen(&self) -> Vec<RecentRoom> {
        let inhalt = match std::fs::read(&self.pfad) {
            Ok(inhalt) => inhalt,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_slice(&inhalt) {
            Ok(raeume) => raeume,
            Err(e) => {
                tracing::warn!(
                    pfad = %self.pfad.display(),
                    fehler = %e,
                    "Raum-Verlauf beschaedigt, wird als leer behandelt"
                );
                Vec::new()
            }
        }
    }
}
