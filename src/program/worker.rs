// Emulation thread
//
// Holds the session for its whole lifetime and releases it only while it
// services an interrupt request. Each iteration checks for a request, then
// runs one frame (or idles), publishes the frame's side effects through
// atomics and paces itself to the display rate unless fast-forwarding.

use super::guard::mark_emulation_thread;
use super::session::{Session, Step};
use super::Shared;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Sleep between iterations while nothing runs
pub const IDLE_INTERVAL: Duration = Duration::from_millis(20);

/// Target frame period (60 Hz)
pub const FRAME_PERIOD: Duration = Duration::from_nanos(16_666_667);

/// Frame pacing against a fixed period
#[derive(Debug, Clone)]
pub struct Pacer {
    period: Duration,
    next: Option<Instant>,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// Time to wait before the next frame
    ///
    /// Falling behind resynchronizes instead of running frames back to back.
    pub fn delay(&mut self, now: Instant) -> Option<Duration> {
        let target = self.next.unwrap_or(now) + self.period;
        if target <= now {
            self.next = Some(now);
            None
        } else {
            self.next = Some(target);
            Some(target - now)
        }
    }

    pub fn reset(&mut self) {
        self.next = None;
    }
}

/// Frames per wall-clock second
#[derive(Debug, Clone)]
pub struct FpsCounter {
    since: Instant,
    frames: u32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            since: now,
            frames: 0,
        }
    }

    /// Count an iteration
    ///
    /// # Returns
    /// The frame count of the last second, once per second
    pub fn tick(&mut self, now: Instant, ran: bool) -> Option<u32> {
        if ran {
            self.frames += 1;
        }
        if now.duration_since(self.since) < Duration::from_secs(1) {
            return None;
        }
        let frames = std::mem::take(&mut self.frames);
        self.since = now;
        Some(frames)
    }
}

/// One iteration on the session, with its results published to `shared`
pub(crate) fn advance(shared: &Shared, session: &mut Session, now: Instant) -> Step {
    let step = session.step(&shared.input, now);
    let messages = session.output.take_messages();
    if !messages.is_empty() {
        shared.messages.lock().extend(messages);
    }
    if let Step::Ran { resized } = step {
        shared.frames.fetch_add(1, Ordering::Relaxed);
        if resized {
            shared.needs_resize.store(true, Ordering::Release);
        }
    }
    step
}

pub(crate) fn spawn(shared: Arc<Shared>) -> io::Result<JoinHandle<()>> {
    shared.session.interrupt().set_running(true);
    let result = thread::Builder::new()
        .name("emulation".to_string())
        .spawn({
            let shared = Arc::clone(&shared);
            move || run(&shared)
        });
    if result.is_err() {
        shared.session.interrupt().set_running(false);
    }
    result
}

fn run(shared: &Shared) {
    mark_emulation_thread();
    log::debug!("Emulation thread started");

    let interrupt = shared.session.interrupt();
    let mut pacer = Pacer::new(FRAME_PERIOD);
    let mut fps = FpsCounter::new(Instant::now());
    let mut lock = shared.session.hold();

    loop {
        shared.session.service(&mut lock);
        if interrupt.quitting() {
            break;
        }

        let now = Instant::now();
        let (step, fast_forward) = {
            let mut session = lock.borrow_mut();
            let step = advance(shared, &mut session, now);
            (step, session.fast_forward())
        };

        let ran = step != Step::Idle;
        if let Some(vblanks) = fps.tick(now, ran) {
            shared.vblanks.store(vblanks, Ordering::Relaxed);
        }

        if !ran {
            pacer.reset();
            interrupt.idle(IDLE_INTERVAL);
        } else if fast_forward {
            pacer.reset();
        } else if let Some(delay) = pacer.delay(Instant::now()) {
            interrupt.idle(delay);
        }
    }

    drop(lock);
    interrupt.set_running(false);
    log::debug!("Emulation thread stopped");
}
