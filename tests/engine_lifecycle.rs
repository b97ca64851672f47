#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use serde_json::json;
use woo_notify::engine::{Engine, Page, Phase, Schedule, ScriptedChooser, Wake};
use woo_notify::payload::Payload;

/// Virtual clock that fires engine wakes in due order.
struct Timeline {
    engine: Engine<Page, ScriptedChooser>,
    now: Duration,
    seq: u64,
    pending: Vec<Pending>,
    max_attached: usize,
}

struct Pending {
    due: Duration,
    seq: u64,
    wake: Wake,
    every: Option<Duration>,
}

impl Timeline {
    fn start(payload: serde_json::Value, script: &[usize]) -> Self {
        let payload: Payload = serde_json::from_value(payload).expect("payload");
        let engine = Engine::start(Some(payload), Page::new(), ScriptedChooser::new(script))
            .expect("engine should start");
        let mut timeline = Self {
            engine,
            now: Duration::ZERO,
            seq: 0,
            pending: Vec::new(),
            max_attached: 0,
        };
        timeline.collect();
        timeline
    }

    fn at(&mut self, millis: u64) -> &mut Self {
        let target = Duration::from_millis(millis);
        while let Some(index) = self.next_due(target) {
            let fired = self.pending.swap_remove(index);
            self.now = fired.due;
            if let Some(period) = fired.every {
                self.push(fired.due + period, fired.wake, Some(period));
            }
            self.engine.handle(fired.wake);
            self.collect();
            self.max_attached = self.max_attached.max(self.attached());
        }
        self.now = target;
        self
    }

    fn next_due(&self, target: Duration) -> Option<usize> {
        self.pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= target)
            .min_by_key(|(_, p)| (p.due, p.seq))
            .map(|(index, _)| index)
    }

    fn collect(&mut self) {
        for schedule in self.engine.take_schedules() {
            match schedule {
                Schedule::Once { delay, wake } => self.push(self.now + delay, wake, None),
                Schedule::Every { period, wake } => {
                    self.push(self.now + period, wake, Some(period));
                }
                Schedule::CancelRepeating => self.pending.retain(|p| p.every.is_none()),
            }
        }
    }

    fn push(&mut self, due: Duration, wake: Wake, every: Option<Duration>) {
        self.seq += 1;
        self.pending.push(Pending {
            due,
            seq: self.seq,
            wake,
            every,
        });
    }

    fn phase(&self) -> Option<Phase> {
        self.engine.phase()
    }

    fn attached(&self) -> usize {
        self.engine.surface().attached_count()
    }

    fn sentences(&self) -> Vec<String> {
        self.engine
            .surface()
            .attached()
            .map(|element| element.text_content())
            .collect()
    }
}

fn order(name: &str, title: &str) -> serde_json::Value {
    json!({ "name": name, "product": { "title": title, "url": format!("/p/{title}") } })
}

fn payload(orders: serde_json::Value, interval: u64, duration: u64) -> serde_json::Value {
    json!({
        "orders": orders,
        "interval": interval,
        "duration": duration,
        "actionVariations": ["bought"],
    })
}

#[test]
fn notification_walks_through_its_timeline() {
    let mut timeline = Timeline::start(payload(json!([order("Dana", "Mug")]), 10_000, 5_000), &[0]);

    assert_eq!(timeline.at(999).attached(), 0);
    assert_eq!(timeline.at(1_000).phase(), Some(Phase::Entering));
    assert_eq!(timeline.attached(), 1);
    assert_eq!(timeline.at(1_009).phase(), Some(Phase::Entering));
    assert_eq!(timeline.at(1_010).phase(), Some(Phase::Visible));
    assert_eq!(timeline.at(5_999).phase(), Some(Phase::Visible));
    assert_eq!(timeline.at(6_000).phase(), Some(Phase::Leaving));
    assert_eq!(timeline.at(6_299).attached(), 1);
    assert_eq!(timeline.at(6_300).phase(), None);
    assert_eq!(timeline.attached(), 0);

    // The repeating ticker brings the next one at the full interval.
    assert_eq!(timeline.at(10_000).phase(), Some(Phase::Entering));
    assert_eq!(timeline.engine.shown(), 2);
}

#[test]
fn the_visible_text_matches_the_announcement() {
    let mut timeline = Timeline::start(payload(json!([order("Dana", "Mug")]), 10_000, 5_000), &[0]);
    timeline.at(1_010);
    assert!(
        timeline.sentences()[0].starts_with("Dana just bought MugDana just bought Mug"),
        "content is followed by its screen-reader copy"
    );
}

#[test]
fn never_more_than_one_on_the_page() {
    let orders = json!([order("Dana", "Mug"), order("Ana", "Tee"), order("Lee", "Cap")]);
    let mut timeline = Timeline::start(payload(orders, 2_000, 5_000), &[0, 1, 2]);
    timeline.at(60_000);
    assert_eq!(timeline.max_attached, 1);
    assert!(timeline.engine.shown() >= 29);
}

#[test]
fn preempted_notification_timers_do_not_touch_the_next_one() {
    let orders = json!([order("Dana", "Mug"), order("Ana", "Tee")]);
    let mut timeline = Timeline::start(payload(orders, 4_000, 5_000), &[0, 1]);

    timeline.at(1_010);
    let first = timeline.engine.current_id();
    assert_eq!(timeline.phase(), Some(Phase::Visible));

    // Tick at 4s removes the first notification on the spot.
    timeline.at(4_000);
    assert_ne!(timeline.engine.current_id(), first);
    assert_eq!(timeline.attached(), 1);
    assert!(timeline.sentences()[0].starts_with("Ana just bought Tee"));

    // The first notification's dismiss timer fires at 6s and must be ignored.
    assert_eq!(timeline.at(6_500).phase(), Some(Phase::Visible));
    assert_eq!(timeline.at(7_999).phase(), Some(Phase::Visible));
    assert_eq!(timeline.attached(), 1);
}

#[test]
fn incomplete_record_skips_one_tick_only() {
    let orders = json!([{ "name": "Dana" }, order("Ana", "Tee")]);
    let mut timeline = Timeline::start(payload(orders, 3_000, 1_000), &[0, 1]);

    timeline.at(1_500);
    assert_eq!(timeline.attached(), 0);
    assert_eq!(timeline.engine.shown(), 0);

    timeline.at(3_000);
    assert_eq!(timeline.phase(), Some(Phase::Entering));
    assert!(timeline.sentences()[0].starts_with("Ana just bought Tee"));
}

#[test]
fn empty_orders_start_nothing() {
    let payload: Payload =
        serde_json::from_value(payload(json!([]), 10_000, 5_000)).expect("payload");
    let mut page = Page::new();
    let engine = Engine::start(Some(payload), &mut page, ScriptedChooser::new([0]));
    assert!(engine.is_none());
    drop(engine);
    assert_eq!(page.writes(), 0);
    assert!(page.root_style().is_empty());
}

#[test]
fn teardown_stops_everything() {
    let mut timeline = Timeline::start(payload(json!([order("Dana", "Mug")]), 2_000, 5_000), &[0]);
    timeline.at(1_500);
    assert_eq!(timeline.attached(), 1);

    timeline.engine.teardown();
    timeline.collect();
    assert_eq!(timeline.attached(), 0);
    assert!(timeline.pending.iter().all(|p| p.every.is_none()));

    let shown = timeline.engine.shown();
    timeline.at(60_000);
    assert_eq!(timeline.engine.shown(), shown);
    assert_eq!(timeline.attached(), 0);
}

#[test]
fn malformed_record_does_not_silence_the_page() {
    let orders = json!([
        { "name": 42, "product": { "title": "Tee", "url": "/p/Tee" } },
        order("Dana", "Mug"),
    ]);
    let mut timeline = Timeline::start(payload(orders, 3_000, 1_000), &[0, 1]);

    timeline.at(1_500);
    assert_eq!(timeline.engine.shown(), 0);

    timeline.at(3_000);
    assert_eq!(timeline.phase(), Some(Phase::Entering));
    assert!(timeline.sentences()[0].starts_with("Dana just bought Mug"));
}
