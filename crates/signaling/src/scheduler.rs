//! Abbrechbare Zeitgeber pro Kanal
//!
//! Jeder Kanal hat hoechstens einen Zeitgeber pro `TimerKind`. Ein neues
//! `planen` fuer denselben Schluessel bricht den vorherigen ab. Ein
//! abgelaufener Zeitgeber fuehrt seine Aufgabe nur aus, wenn sein Eintrag
//! noch der aktuelle ist (Generationszaehler).

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use skinnygate_core::CallId;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;

/// Art des Zeitgebers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Ziffern-Timeout (auch fuer die erste Ziffer nach dem Abheben)
    DigitTimeout,
    /// Verzoegertes Auflegen nach einem Fehlerzustand
    Hangup,
    /// Weiterleitung bei Nichtmelden
    CfwdNoAnswer,
}

#[derive(Default)]
struct SchedulerInner {
    timers: DashMap<(CallId, TimerKind), (u64, AbortHandle)>,
    generation: AtomicU64,
}

#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Plant `aufgabe` nach `nach`, ersetzt einen bestehenden Zeitgeber
    pub fn planen<F>(&self, call_id: CallId, art: TimerKind, nach: Duration, aufgabe: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let inner = Arc::clone(&self.inner);
        let schluessel = (call_id, art);

        // Eintrag bleibt gesperrt bis der neue Handle drin ist
        match self.inner.timers.entry(schluessel) {
            Entry::Occupied(mut eintrag) => {
                let handle = starten(inner, schluessel, generation, nach, aufgabe);
                let (_, alt) = eintrag.insert((generation, handle));
                alt.abort();
            }
            Entry::Vacant(eintrag) => {
                let handle = starten(inner, schluessel, generation, nach, aufgabe);
                eintrag.insert((generation, handle));
            }
        }

        tracing::trace!(%call_id, ?art, nach_ms = nach.as_millis() as u64, "Zeitgeber geplant");
    }

    /// Bricht einen Zeitgeber ab. `true` wenn einer aktiv war
    pub fn abbrechen(&self, call_id: CallId, art: TimerKind) -> bool {
        match self.inner.timers.remove(&(call_id, art)) {
            Some((_, (_, handle))) => {
                handle.abort();
                tracing::trace!(%call_id, ?art, "Zeitgeber abgebrochen");
                true
            }
            None => false,
        }
    }

    /// Bricht alle Zeitgeber eines Kanals ab
    pub fn alle_abbrechen(&self, call_id: CallId) {
        let schluessel: Vec<_> = self
            .inner
            .timers
            .iter()
            .filter(|e| e.key().0 == call_id)
            .map(|e| *e.key())
            .collect();
        for (id, art) in schluessel {
            self.abbrechen(id, art);
        }
    }

    pub fn ist_geplant(&self, call_id: CallId, art: TimerKind) -> bool {
        self.inner.timers.contains_key(&(call_id, art))
    }

    pub fn anzahl(&self) -> usize {
        self.inner.timers.len()
    }
}

fn starten<F>(
    inner: Arc<SchedulerInner>,
    schluessel: (CallId, TimerKind),
    generation: u64,
    nach: Duration,
    aufgabe: F,
) -> AbortHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(nach).await;
        let aktuell = inner
            .timers
            .remove_if(&schluessel, |_, (g, _)| *g == generation)
            .is_some();
        // Eintrag vor der Aufgabe entfernen, damit sie neu planen darf
        drop(inner);
        if aktuell {
            aufgabe.await;
        }
    })
    .abort_handle()
}
