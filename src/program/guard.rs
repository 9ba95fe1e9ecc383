// Interrupt guard
//
// The emulation thread owns the session while it runs and never takes a
// lock per frame: it holds the session mutex across iterations and only
// checks an atomic flag at the top of each one. A thread that needs to
// touch the session builds a `Guard`, which raises an interrupt request,
// waits until the emulation thread acknowledges it by parking (releasing
// the mutex while it waits), and then locks the session. Dropping the
// last guard releases the request and the emulation thread resumes.
//
// Guards nest on the same thread: only the first one raises the request,
// only the last one releases it. The emulation thread itself may build
// guards too; they skip the handshake since it already owns the session.

use parking_lot::{Condvar, Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::cell::{Cell, RefCell};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

thread_local! {
    static EMULATION_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Mark the current thread as the emulation thread
pub fn mark_emulation_thread() {
    EMULATION_THREAD.with(|flag| flag.set(true));
}

pub fn is_emulation_thread() -> bool {
    EMULATION_THREAD.with(Cell::get)
}

#[derive(Debug, Default)]
struct InterruptState {
    /// An emulation thread is servicing requests
    running: bool,
    /// A request is raised
    waiting: bool,
    /// The emulation thread acknowledged the request and is parked
    working: bool,
    quitting: bool,
    /// Guards alive on non-emulation threads
    depth: usize,
    /// Number of requests raised so far
    interrupts: u64,
}

/// Request/acknowledge handshake between the UI thread and the emulation
/// thread
#[derive(Debug, Default)]
pub struct Interrupt {
    state: Mutex<InterruptState>,
    condvar: Condvar,
    /// Lock-free copies of `state.waiting` and `state.quitting` for the
    /// emulation thread's hot path
    pending: AtomicBool,
    stopping: AtomicBool,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare whether an emulation thread services requests
    ///
    /// Without one, guards lock the session directly.
    pub fn set_running(&self, running: bool) {
        let mut state = self.state.lock();
        state.running = running;
        if running {
            state.quitting = false;
            self.stopping.store(false, Ordering::Release);
        }
        self.condvar.notify_all();
    }

    pub fn running(&self) -> bool {
        self.state.lock().running
    }

    /// Raise a request and wait for the acknowledgment
    ///
    /// Nested calls only bump the depth.
    ///
    /// # Returns
    ///
    /// `false` if no emulation thread is running (nothing to release)
    fn request(&self) -> bool {
        let mut state = self.state.lock();
        if !state.running {
            return false;
        }
        state.depth += 1;
        if state.depth == 1 {
            state.waiting = true;
            state.interrupts += 1;
            self.pending.store(true, Ordering::Release);
            self.condvar.notify_all();
            while !state.working && state.running && !state.quitting {
                self.condvar.wait(&mut state);
            }
        }
        true
    }

    /// Drop one level; the last one lets the emulation thread resume
    fn release(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.depth > 0, "interrupt released without a request");
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.waiting = false;
            state.working = false;
            self.pending.store(false, Ordering::Release);
            self.condvar.notify_all();
        }
    }

    /// Whether a request is raised; checked once per emulation iteration
    pub fn pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Acknowledge the raised request and block until it is released
    ///
    /// Returns immediately when nothing is waiting. Must be called with the
    /// session unlocked.
    pub fn acknowledge(&self) {
        let mut state = self.state.lock();
        // A new request can arrive before this thread wakes from the
        // previous release; acknowledge it without resuming
        while state.waiting && !state.quitting {
            if !state.working {
                state.working = true;
                self.condvar.notify_all();
            }
            self.condvar.wait(&mut state);
        }
    }

    /// Sleep up to `timeout`, waking early on a request or quit
    pub fn idle(&self, timeout: Duration) {
        let mut state = self.state.lock();
        if state.waiting || state.quitting {
            return;
        }
        self.condvar.wait_for(&mut state, timeout);
    }

    /// Ask the emulation thread to exit
    pub fn quit(&self) {
        let mut state = self.state.lock();
        state.quitting = true;
        self.stopping.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    pub fn quitting(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Requests raised so far; nested guards count once
    pub fn interrupts(&self) -> u64 {
        self.state.lock().interrupts
    }

    /// Guards currently alive off the emulation thread
    pub fn depth(&self) -> usize {
        self.state.lock().depth
    }
}

/// Session state shared between the UI thread and the emulation thread
pub struct Guarded<T> {
    interrupt: Interrupt,
    value: ReentrantMutex<RefCell<T>>,
}

impl<T> Guarded<T> {
    pub fn new(value: T) -> Self {
        Self {
            interrupt: Interrupt::new(),
            value: ReentrantMutex::new(RefCell::new(value)),
        }
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Interrupt the emulation thread and lock the session
    pub fn guard(&self) -> Guard<'_, T> {
        let requested = !is_emulation_thread() && self.interrupt.request();
        Guard {
            lock: self.value.lock(),
            interrupt: &self.interrupt,
            requested,
        }
    }

    /// Lock the session for the emulation thread's loop
    pub fn hold(&self) -> ReentrantMutexGuard<'_, RefCell<T>> {
        self.value.lock()
    }

    /// Park the emulation thread while a request is raised
    ///
    /// The session is unlocked for the duration of the wait.
    ///
    /// # Returns
    ///
    /// `true` if the thread was parked
    pub fn service(&self, lock: &mut ReentrantMutexGuard<'_, RefCell<T>>) -> bool {
        if !self.interrupt.pending() {
            return false;
        }
        ReentrantMutexGuard::unlocked(lock, || self.interrupt.acknowledge());
        true
    }
}

/// Exclusive access to the session while the emulation thread is parked
pub struct Guard<'a, T> {
    lock: ReentrantMutexGuard<'a, RefCell<T>>,
    interrupt: &'a Interrupt,
    requested: bool,
}

impl<T> Guard<'_, T> {
    /// Whether this guard raised (or joined) an interrupt request
    pub fn interrupted(&self) -> bool {
        self.requested
    }
}

impl<T> Deref for Guard<'_, T> {
    type Target = RefCell<T>;

    fn deref(&self) -> &RefCell<T> {
        &self.lock
    }
}

impl<T> Drop for Guard<'_, T> {
    fn drop(&mut self) {
        // The lock field is dropped right after; the emulation thread
        // blocks on it briefly when it wakes up first
        if self.requested {
            self.interrupt.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_guard_without_worker_locks_directly() {
        let shared = Guarded::new(1u32);
        {
            let guard = shared.guard();
            assert!(!guard.interrupted());
            *guard.borrow_mut() += 1;
        }
        assert_eq!(*shared.guard().borrow(), 2);
        assert_eq!(shared.interrupt().interrupts(), 0);
    }

    fn spawn_worker(
        shared: Arc<Guarded<u64>>,
        frames: Arc<AtomicU64>,
    ) -> thread::JoinHandle<()> {
        shared.interrupt().set_running(true);
        thread::Builder::new()
            .name("emulation".to_string())
            .spawn(move || {
                mark_emulation_thread();
                let mut lock = shared.hold();
                while !shared.interrupt().quitting() {
                    shared.service(&mut lock);
                    *lock.borrow_mut() += 1;
                    frames.fetch_add(1, Ordering::Relaxed);
                    // Nested guard on the emulation thread is a no-op
                    let inner = shared.guard();
                    assert!(!inner.interrupted());
                    drop(inner);
                    shared.interrupt().idle(Duration::from_millis(1));
                }
                drop(lock);
                shared.interrupt().set_running(false);
            })
            .unwrap()
    }

    #[test]
    fn test_nested_guards_interrupt_once() {
        let shared = Arc::new(Guarded::new(0u64));
        let frames = Arc::new(AtomicU64::new(0));
        let worker = spawn_worker(Arc::clone(&shared), Arc::clone(&frames));

        let deadline = Instant::now() + Duration::from_secs(5);
        while frames.load(Ordering::Relaxed) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        {
            let outer = shared.guard();
            assert!(outer.interrupted());
            let parked_at = *outer.borrow();
            {
                let middle = shared.guard();
                let inner = shared.guard();
                assert_eq!(shared.interrupt().depth(), 3);
                *inner.borrow_mut() = 1000;
                drop(inner);
                drop(middle);
            }
            assert_eq!(shared.interrupt().depth(), 1);
            thread::sleep(Duration::from_millis(20));
            // Still parked: the counter only moved by our own write
            assert_eq!(*outer.borrow(), 1000);
            assert!(parked_at < 1000);
        }
        assert_eq!(shared.interrupt().interrupts(), 1);
        assert_eq!(shared.interrupt().depth(), 0);

        // The worker resumes after the last guard is gone
        let resumed = frames.load(Ordering::Relaxed);
        let deadline = Instant::now() + Duration::from_secs(5);
        while frames.load(Ordering::Relaxed) == resumed && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(frames.load(Ordering::Relaxed) > resumed);

        shared.interrupt().quit();
        worker.join().unwrap();
        assert!(*shared.guard().borrow() > 1000);
    }

    #[test]
    fn test_sequential_guards_interrupt_each_time() {
        let shared = Arc::new(Guarded::new(0u64));
        let frames = Arc::new(AtomicU64::new(0));
        let worker = spawn_worker(Arc::clone(&shared), Arc::clone(&frames));

        for _ in 0..3 {
            let guard = shared.guard();
            assert!(guard.interrupted());
        }
        assert_eq!(shared.interrupt().interrupts(), 3);

        shared.interrupt().quit();
        worker.join().unwrap();
        assert!(!shared.interrupt().running());
    }
}
