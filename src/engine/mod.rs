//! The notification cycle engine.
//!
//! A synchronous state machine that owns at most one notification at a time.
//! It never arms timers itself: each transition that needs a later callback
//! queues a [`Schedule`], the host drains them with
//! [`Engine::take_schedules`] and feeds fired timers back through
//! [`Engine::handle`].
//!
//! Lifecycle per notification:
//! `Idle -> Entering -> Visible -> Leaving -> Removed -> Idle`.
//! A tick that finds a notification still on the page removes it on the spot
//! before showing the next one.

pub mod choice;
pub mod render;
pub mod surface;
pub mod timers;

use std::time::Duration;

use tracing::{debug, warn};

use crate::payload::{EngineConfig, Payload};

#[cfg(not(target_arch = "wasm32"))]
pub use choice::RngChooser;
pub use choice::{Chooser, ScriptedChooser, choose};
pub use render::{Element, Fragment, Node, build_notification};
pub use surface::{NodeId, Page, Surface};
pub use timers::TimerSet;

/// Delay between attaching a notification and marking it visible, so the
/// stylesheet transition has a starting frame.
pub const ENTER_DELAY: Duration = Duration::from_millis(10);

/// The first notification appears after this, well before the first full
/// interval.
pub const FIRST_TICK_DELAY: Duration = Duration::from_secs(1);

/// Identifies one shown notification. Wakes carry it so a late timer cannot
/// act on a newer notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl NotificationId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wake {
    Tick,
    Reveal(NotificationId),
    Dismiss(NotificationId),
    Detach(NotificationId),
}

/// Timer request for the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    Once { delay: Duration, wake: Wake },
    Every { period: Duration, wake: Wake },
    /// Stop the repeating timer armed by `Every`.
    CancelRepeating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Attached, not yet styled visible.
    Entering,
    Visible,
    /// Hide transition running; detach follows.
    Leaving,
}

#[derive(Debug)]
struct Active<H> {
    id: NotificationId,
    handle: H,
    phase: Phase,
}

pub struct Engine<S: Surface, C: Chooser> {
    config: EngineConfig,
    leave_delay: Duration,
    surface: S,
    chooser: C,
    current: Option<Active<S::Handle>>,
    next_id: u64,
    shown: u64,
    stopped: bool,
    pending: Vec<Schedule>,
}

impl<S: Surface, C: Chooser> Engine<S, C> {
    /// Ingests the payload and starts the cycle.
    ///
    /// Returns `None`, without touching the surface, when there is no payload
    /// or it carries no orders. Otherwise the CSS variables are applied to the
    /// document root and the repeating ticker plus the early first tick are
    /// queued.
    pub fn start(payload: Option<Payload>, surface: S, chooser: C) -> Option<Self> {
        let Some(config) = EngineConfig::ingest(payload) else {
            debug!("no orders to show, staying idle");
            return None;
        };

        let mut engine = Self {
            leave_delay: config.leave_delay(),
            config,
            surface,
            chooser,
            current: None,
            next_id: 0,
            shown: 0,
            stopped: false,
            pending: Vec::new(),
        };
        engine.apply_css_variables();
        engine.pending.push(Schedule::Every {
            period: engine.config.interval,
            wake: Wake::Tick,
        });
        engine.pending.push(Schedule::Once {
            delay: FIRST_TICK_DELAY,
            wake: Wake::Tick,
        });
        debug!(
            orders = engine.config.orders.len(),
            interval_ms = engine.config.interval.as_millis(),
            duration_ms = engine.config.duration.as_millis(),
            "notification cycle started"
        );
        Some(engine)
    }

    pub fn handle(&mut self, wake: Wake) {
        if self.stopped {
            return;
        }
        match wake {
            Wake::Tick => self.show_next(),
            Wake::Reveal(id) => self.reveal(id),
            Wake::Dismiss(id) => self.dismiss(id),
            Wake::Detach(id) => self.detach(id),
        }
    }

    /// Page unload: stop the ticker and drop whatever is on screen without
    /// its exit animation. Later wakes are ignored.
    pub fn teardown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.pending.push(Schedule::CancelRepeating);
        if let Some(active) = self.current.take() {
            self.remove_now(active);
        }
        debug!(shown = self.shown, "notification cycle stopped");
    }

    /// Drains timer requests queued since the last call.
    pub fn take_schedules(&mut self) -> Vec<Schedule> {
        std::mem::take(&mut self.pending)
    }

    pub fn phase(&self) -> Option<Phase> {
        self.current.as_ref().map(|active| active.phase)
    }

    pub fn current_id(&self) -> Option<NotificationId> {
        self.current.as_ref().map(|active| active.id)
    }

    /// Notifications attached so far.
    pub const fn shown(&self) -> u64 {
        self.shown
    }

    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn leave_delay(&self) -> Duration {
        self.leave_delay
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn apply_css_variables(&mut self) {
        for (name, value) in &self.config.css_variables {
            if let Err(err) = self.surface.set_root_property(name, value) {
                warn!(error = %err, property = %name, "failed to apply css variable");
            }
        }
    }

    fn show_next(&mut self) {
        if let Some(prior) = self.current.take() {
            debug!(id = prior.id.0, phase = ?prior.phase, "preempting notification");
            self.remove_now(prior);
        }

        let Some(order) = choose(&mut self.chooser, &self.config.orders) else {
            return;
        };
        let Some((name, product)) = order.displayable() else {
            debug!("order record lacks a name or product, skipping tick");
            return;
        };
        let fragment = build_notification(
            &self.config,
            name,
            product,
            order.additional_items,
            &mut self.chooser,
        );

        let handle = match self.surface.attach(&fragment) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(error = %err, "failed to attach notification");
                return;
            }
        };

        let id = NotificationId(self.next_id);
        self.next_id += 1;
        self.shown += 1;
        self.current = Some(Active {
            id,
            handle,
            phase: Phase::Entering,
        });
        debug!(id = id.0, sentence = %fragment.announcement, "notification entering");

        self.pending.push(Schedule::Once {
            delay: ENTER_DELAY,
            wake: Wake::Reveal(id),
        });
        self.pending.push(Schedule::Once {
            delay: self.config.duration,
            wake: Wake::Dismiss(id),
        });
    }

    fn reveal(&mut self, id: NotificationId) {
        let Some(active) = self.current.as_mut().filter(|active| active.id == id) else {
            return;
        };
        if active.phase != Phase::Entering {
            return;
        }
        if let Err(err) = self.surface.set_phase(&active.handle, Phase::Visible) {
            warn!(error = %err, id = id.0, "failed to reveal notification");
        }
        active.phase = Phase::Visible;
        debug!(id = id.0, "notification visible");
    }

    fn dismiss(&mut self, id: NotificationId) {
        let Some(active) = self.current.as_mut().filter(|active| active.id == id) else {
            return;
        };
        if active.phase == Phase::Leaving {
            return;
        }
        if let Err(err) = self.surface.set_phase(&active.handle, Phase::Leaving) {
            warn!(error = %err, id = id.0, "failed to start hide transition");
        }
        active.phase = Phase::Leaving;
        self.pending.push(Schedule::Once {
            delay: self.leave_delay,
            wake: Wake::Detach(id),
        });
        debug!(id = id.0, "notification leaving");
    }

    fn detach(&mut self, id: NotificationId) {
        if self.current_id() != Some(id) {
            return;
        }
        if let Some(active) = self.current.take() {
            self.remove_now(active);
        }
    }

    fn remove_now(&mut self, active: Active<S::Handle>) {
        let id = active.id.0;
        if let Err(err) = self.surface.detach(active.handle) {
            warn!(error = %err, id, "failed to detach notification");
        }
        debug!(id, "notification removed");
    }
}

/// Parses a CSS `<time>` value such as `0.3s` or `300ms`.
pub fn css_time(raw: &str) -> Option<Duration> {
    let raw = raw.trim().to_ascii_lowercase();
    let (number, scale) = if let Some(ms) = raw.strip_suffix("ms") {
        (ms, 1.0)
    } else if let Some(secs) = raw.strip_suffix('s') {
        (secs, 1000.0)
    } else {
        return None;
    };
    let value: f64 = number.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let millis = (value * scale).round() as u64;
    Some(Duration::from_millis(millis))
}
