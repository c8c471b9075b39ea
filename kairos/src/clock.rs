use indexmap::IndexMap;
use smol_str::SmolStr;

/// A scheduled alarm that fired: which timer, and at what logical time.
///
/// `callback` is a plain payload carrying whatever context the timer was armed with, rather
/// than a closure - `TestClock::advance_to` returns a batch of these for the caller to dispatch
/// through the message bus, keeping clock advancement and event delivery as separate steps
/// (`spec.md` §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEvent<Callback> {
    pub name: SmolStr,
    pub fire_ts: i64,
    pub callback: Callback,
}

struct Timer<Callback> {
    interval: i64,
    next_fire_ts: i64,
    callback: Callback,
    /// `None` for a one-shot timer: it fires once then is removed.
    periodic: bool,
}

/// Advances a logical clock from one `ts_event` to the next, firing timers along the way.
///
/// Grounded in the trait split `barter::engine::clock::EngineClock` uses for
/// `LiveClock`/`HistoricalClock`, generalised here to carry the timer-firing machinery
/// `spec.md` §4.2 requires, which the teacher's own clocks do not implement.
pub trait Clock {
    fn now_ns(&self) -> i64;
}

/// Wall-clock time in nanoseconds. Used outside of backtests; never used by the deterministic
/// driver itself (`spec.md` §5 forbids wall-clock time in the simulation path).
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct LiveClock;

impl Clock for LiveClock {
    fn now_ns(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_nanos() as i64
    }
}

/// A logical clock driven entirely by `advance_to`, the only time source the backtest driver
/// consults (`spec.md` §4.2, §5).
#[derive(Debug, Default)]
pub struct TestClock<Callback> {
    now_ns: i64,
    timers: IndexMap<SmolStr, Timer<Callback>>,
}

impl<Callback: Clone> std::fmt::Debug for Timer<Callback>
where
    Callback: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("interval", &self.interval)
            .field("next_fire_ts", &self.next_fire_ts)
            .field("periodic", &self.periodic)
            .finish()
    }
}

impl<Callback: Clone> TestClock<Callback> {
    pub fn new(start_ns: i64) -> Self {
        Self {
            now_ns: start_ns,
            timers: IndexMap::new(),
        }
    }

    pub fn now_ns(&self) -> i64 {
        self.now_ns
    }

    /// Arm a one-shot timer named `name`, firing once at `fire_ts`.
    pub fn set_time_alert(&mut self, name: impl Into<SmolStr>, fire_ts: i64, callback: Callback) {
        self.timers.insert(
            name.into(),
            Timer {
                interval: 0,
                next_fire_ts: fire_ts,
                callback,
                periodic: false,
            },
        );
    }

    /// Arm a periodic timer named `name`, first firing at `first_fire_ts` and every `interval`
    /// nanoseconds thereafter.
    pub fn set_timer(
        &mut self,
        name: impl Into<SmolStr>,
        interval: i64,
        first_fire_ts: i64,
        callback: Callback,
    ) {
        self.timers.insert(
            name.into(),
            Timer {
                interval,
                next_fire_ts: first_fire_ts,
                callback,
                periodic: true,
            },
        );
    }

    pub fn cancel_timer(&mut self, name: &str) {
        self.timers.shift_remove(name);
    }

    /// Advance the clock to `t`, firing every timer whose next scheduled time lies in
    /// `(previous_now, t]`.
    ///
    /// Events are returned in strictly non-decreasing `fire_ts` order, ties broken by insertion
    /// order of the timers map (a stable sort preserves that for equal keys). A periodic timer
    /// is rescheduled by repeatedly adding `interval` until `next_fire_ts > t`, coalescing any
    /// number of elapsed ticks into exactly one fired event for this call
    /// (`spec.md` §4.2, §8 idempotence property).
    ///
    /// # Panics
    /// `t` must not be earlier than the clock's current time - an `InvariantViolation` would be
    /// the right signal upstream, but the clock itself has no error type in scope, so this is a
    /// debug assertion mirroring the teacher's existing `EngineClock` monotonicity expectations.
    pub fn advance_to(&mut self, t: i64) -> Vec<TimeEvent<Callback>> {
        debug_assert!(t >= self.now_ns, "clock must not move backwards");
        if t < self.now_ns {
            return Vec::new();
        }

        let previous_now = self.now_ns;
        let mut fired = Vec::new();
        let mut exhausted = Vec::new();

        for (name, timer) in self.timers.iter_mut() {
            if timer.next_fire_ts <= previous_now || timer.next_fire_ts > t {
                continue;
            }

            fired.push(TimeEvent {
                name: name.clone(),
                fire_ts: timer.next_fire_ts,
                callback: timer.callback.clone(),
            });

            if timer.periodic && timer.interval > 0 {
                while timer.next_fire_ts <= t {
                    timer.next_fire_ts += timer.interval;
                }
            } else {
                exhausted.push(name.clone());
            }
        }

        fired.sort_by_key(|event| event.fire_ts);

        for name in exhausted {
            self.timers.shift_remove(&name);
        }

        self.now_ns = t;
        fired
    }
}
