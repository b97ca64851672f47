use std::future::Future;
use std::io::Write;

use async_channel::{Sender, unbounded};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep};
use tracing::{debug, info};
use woo_notify::engine::{
    Chooser, Engine, Fragment, NodeId, Page, Phase, Schedule, Surface, TimerSet, Wake,
};
use woo_notify::error::SurfaceError;

/// In-memory page that also prints each notification's sentence.
pub struct ConsoleSurface<W: Write> {
    page: Page,
    out: W,
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            page: Page::new(),
            out,
        }
    }

    #[cfg(test)]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Surface for ConsoleSurface<W> {
    type Handle = NodeId;

    fn set_root_property(&mut self, name: &str, value: &str) -> Result<(), SurfaceError> {
        self.page.set_root_property(name, value)
    }

    fn attach(&mut self, fragment: &Fragment) -> Result<NodeId, SurfaceError> {
        writeln!(self.out, "{}", fragment.announcement)
            .and_then(|()| self.out.flush())
            .map_err(|err| SurfaceError::Dom(err.to_string()))?;
        self.page.attach(fragment)
    }

    fn set_phase(&mut self, handle: &NodeId, phase: Phase) -> Result<(), SurfaceError> {
        self.page.set_phase(handle, phase)
    }

    fn detach(&mut self, handle: NodeId) -> Result<(), SurfaceError> {
        self.page.detach(handle)
    }
}

/// Drives the engine on tokio timers until `shutdown` resolves or `cycles`
/// notifications have run their course, then tears it down.
pub async fn run_preview<S, C, F>(
    mut engine: Engine<S, C>,
    cycles: Option<u64>,
    shutdown: F,
) -> Engine<S, C>
where
    S: Surface,
    C: Chooser,
    F: Future<Output = ()>,
{
    let (tx, rx) = unbounded::<Fired>();
    let mut timers = Timers {
        ticker: None,
        once: TimerSet::new(),
    };
    let done = |engine: &Engine<S, C>| cycles.is_some_and(|limit| engine.shown() >= limit);
    tokio::pin!(shutdown);

    arm(&mut engine, &tx, &mut timers);
    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => break,
            wake = rx.recv() => {
                let Ok((key, wake)) = wake else { break };
                if let Some(key) = key {
                    timers.once.complete(key);
                }
                if wake == Wake::Tick && done(&engine) {
                    debug!("cycle limit reached");
                    break;
                }
                engine.handle(wake);
                arm(&mut engine, &tx, &mut timers);
                if done(&engine) && engine.phase().is_none() {
                    break;
                }
            }
        }
    }

    engine.teardown();
    arm(&mut engine, &tx, &mut timers);
    for pending in timers.once.drain() {
        pending.abort();
    }
    info!(shown = engine.shown(), "notification cycle torn down");
    engine
}

/// A fired wake, tagged with its one-shot timer key when it has one.
type Fired = (Option<u64>, Wake);

struct Timers {
    ticker: Option<JoinHandle<()>>,
    once: TimerSet<JoinHandle<()>>,
}

fn arm<S: Surface, C: Chooser>(
    engine: &mut Engine<S, C>,
    tx: &Sender<Fired>,
    timers: &mut Timers,
) {
    for schedule in engine.take_schedules() {
        match schedule {
            Schedule::Once { delay, wake } => {
                let tx = tx.clone();
                timers.once.insert_with(|key| {
                    tokio::spawn(async move {
                        sleep(delay).await;
                        let _ = tx.send((Some(key), wake)).await;
                    })
                });
            }
            Schedule::Every { period, wake } => {
                let tx = tx.clone();
                let handle = tokio::spawn(async move {
                    let mut interval = interval_at(Instant::now() + period, period);
                    loop {
                        interval.tick().await;
                        if tx.send((None, wake)).await.is_err() {
                            break;
                        }
                    }
                });
                if let Some(previous) = timers.ticker.replace(handle) {
                    previous.abort();
                }
            }
            Schedule::CancelRepeating => {
                if let Some(handle) = timers.ticker.take() {
                    handle.abort();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConsoleSurface, run_preview};
    use std::time::Duration;
    use woo_notify::engine::{Engine, ScriptedChooser};
    use woo_notify::payload::Payload;

    fn payload() -> Payload {
        match serde_json::from_value(serde_json::json!({
            "orders": [
                {"name": "Dana", "product": {"title": "Mug", "url": "/mug"}},
                {"name": "Ana", "product": {"title": "Tee", "url": "/tee"}, "additional_items": 1}
            ],
            "interval": 10000,
            "duration": 5000,
            "actionVariations": ["bought"],
            "showAdditionalItems": true
        })) {
            Ok(payload) => payload,
            Err(err) => panic!("payload: {err}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn preview_stops_after_cycle_limit() {
        let Some(engine) = Engine::start(
            Some(payload()),
            ConsoleSurface::new(Vec::new()),
            ScriptedChooser::new([0, 1, 1, 0]),
        ) else {
            panic!("engine should start");
        };

        let started = tokio::time::Instant::now();
        let engine = run_preview(engine, Some(2), std::future::pending()).await;

        assert_eq!(engine.shown(), 2);
        assert!(engine.is_stopped());
        assert_eq!(engine.surface().page().attached_count(), 0);
        // Second notification appears at 10s and is gone 5.3s later.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(15_300));
        assert!(elapsed < Duration::from_secs(16));

        let printed = String::from_utf8_lossy(engine.surface().output()).into_owned();
        assert_eq!(
            printed,
            "Dana just bought Mug\nAna just bought Tee and 1 more item\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_tears_down_mid_notification() {
        let Some(engine) = Engine::start(
            Some(payload()),
            ConsoleSurface::new(Vec::new()),
            ScriptedChooser::new([0]),
        ) else {
            panic!("engine should start");
        };

        let shutdown = tokio::time::sleep(Duration::from_secs(2));
        let engine = run_preview(engine, None, shutdown).await;

        assert_eq!(engine.shown(), 1);
        assert!(engine.is_stopped());
        assert_eq!(engine.surface().page().attached_count(), 0);
    }
}
