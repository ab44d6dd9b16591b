//! 🚦 Throttler — a bouncer with a clicker counter and a strict headcount.
//!
//! 🎬 *[a dozen threads queue outside the club. the bouncer holds up three fingers.]*
//! *["Three at a time," he says. "Group name's on the list? Then you share the list."]*
//!
//! 📦 A [`Throttler`] is a counting semaphore with a fixed capacity. Wrap any function
//! with it and at most `capacity` calls of that function run at the same time.
//! Give it a group name and it lands in a process-wide registry, so call sites that
//! have never heard of each other can share one headcount.
//!
//! 🧠 Knowledge graph:
//! - `Throttler::new(capacity, group)`: build, and register when a group is given
//! - `Throttler::lookup(group)`: fetch a registered throttler
//! - [`throttler`]: the factory that picks one of the two based on what you hand it
//! - `wrap` / `call`: blocking, for plain threads
//! - `run` / `acquire`: async, for tokio land. Same semaphore, same headcount.
//! - `is_locked`: a diagnostic peek, racy by nature. Don't branch on it.
//!
//! ⚠️ No timeouts. No cancellation on the blocking path. No fairness promises.
//! A wrapped function that calls itself while capacity is exhausted waits forever.

mod permit;
mod registry;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::error::ThrottleError;

pub use permit::ThrottlePermit;
pub use registry::registered_groups;

/// 🚦 Limits how many wrapped calls run at once.
///
/// Handed out as `Arc<Throttler>` because the registry keeps a copy and every
/// wrapped closure keeps a copy. Capacity and group are fixed at birth.
#[derive(Debug)]
pub struct Throttler {
    capacity: usize,
    group: Option<String>,
    // -- 🎟️ Arc'd so permits can be owned, and outlive the borrow that created them
    semaphore: Arc<Semaphore>,
}

impl Throttler {
    /// 🏗️ Build a throttler with `capacity` permits, registering it under `group` if one is given.
    ///
    /// 💀 `InvalidArgument` if `capacity` is 0 or bigger than the semaphore can count.
    /// 💀 `DuplicateGroup` if `group` is already registered. The registry is untouched.
    pub fn new(capacity: usize, group: Option<&str>) -> Result<Arc<Self>, ThrottleError> {
        if capacity == 0 {
            return Err(ThrottleError::InvalidArgument(
                "'capacity' must be at least 1".to_string(),
            ));
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(ThrottleError::InvalidArgument(format!(
                "'capacity' must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                capacity
            )));
        }

        let the_throttler = Arc::new(Self {
            capacity,
            group: group.map(str::to_string),
            semaphore: Arc::new(Semaphore::new(capacity)),
        });

        match group {
            Some(name) => registry::register(name, Arc::clone(&the_throttler))?,
            None => debug!("🚦 built standalone throttler with capacity {}", capacity),
        }

        Ok(the_throttler)
    }

    /// 🔎 Fetch the throttler registered under `group`, or `NotFound`.
    pub fn lookup(group: &str) -> Result<Arc<Self>, ThrottleError> {
        registry::lookup(group)
    }

    /// Number of concurrent calls this throttler permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The group this throttler is registered under. `None` for standalone throttlers.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Permits free right now. A snapshot, stale on arrival under contention.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 👀 True if an acquisition attempted right now would have to wait.
    ///
    /// Best effort only. Another thread can take or return a permit between this
    /// returning and you reading the answer. Good for logs, bad for `if`.
    pub fn is_locked(&self) -> bool {
        self.semaphore.available_permits() == 0
    }

    /// 🧱 Take a permit, parking the current thread until one frees up.
    ///
    /// Parks the OS thread, not a task. Calling this from inside an async task
    /// blocks that runtime worker, so async code wants [`Throttler::acquire`].
    pub fn acquire_blocking(&self) -> ThrottlePermit {
        // -- ⚡ fast path: a free permit means no executor, no parking, no drama
        if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
            trace!("🎟️ permit granted without waiting");
            return ThrottlePermit::new(permit, self.group.clone());
        }

        debug!(
            "⏳ throttler {:?} is full ({} permits), blocking until one frees up",
            self.group.as_deref().unwrap_or("<standalone>"),
            self.capacity
        );
        let permit = futures::executor::block_on(Arc::clone(&self.semaphore).acquire_owned())
            // -- 🐛 safe expect: the semaphore is private and nothing ever calls `close()` on it
            .expect("throttler semaphore is never closed");
        ThrottlePermit::new(permit, self.group.clone())
    }

    /// 🎟️ Take a permit, yielding to the runtime until one frees up.
    pub async fn acquire(&self) -> ThrottlePermit {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            // -- 🐛 same deal as acquire_blocking: never closed, can't error
            .expect("throttler semaphore is never closed");
        trace!("🎟️ permit granted to async caller");
        ThrottlePermit::new(permit, self.group.clone())
    }

    /// 🔁 Run `f` while holding a permit, blocking the thread until one is available.
    ///
    /// Whatever `f` returns comes back untouched, `Err` included. The permit is
    /// released on the way out no matter how `f` leaves, panics too.
    pub fn call<R>(&self, f: impl FnOnce() -> R) -> R {
        let _permit = self.acquire_blocking();
        f()
    }

    /// 🎁 Wrap `f` so every invocation goes through this throttler.
    ///
    /// Same argument, same return value, just with a permit held around the call.
    /// Multi-argument functions take a tuple: `throttler.wrap(|(a, b)| a + b)`.
    /// The returned closure keeps its own `Arc` to the throttler, so it can be
    /// moved into threads and outlive the handle it was built from.
    pub fn wrap<A, R, F>(self: &Arc<Self>, f: F) -> impl Fn(A) -> R + use<A, R, F>
    where
        F: Fn(A) -> R,
    {
        let the_throttler = Arc::clone(self);
        move |args| the_throttler.call(|| f(args))
    }

    /// ⚡ Await a permit, then drive `fut` to completion while holding it.
    pub async fn run<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        let _permit = self.acquire().await;
        fut.await
    }
}

/// 🏭 The one-stop factory, picking a path by what you hand it:
///
/// | `capacity` | `group` | result                                     |
/// |------------|---------|--------------------------------------------|
/// | `Some`     | `Some`  | new throttler, registered (`DuplicateGroup`) |
/// | `Some`     | `None`  | new standalone throttler, never registered |
/// | `None`     | `Some`  | existing registered throttler (`NotFound`) |
/// | `None`     | `None`  | `InvalidArgument`                          |
pub fn throttler(
    capacity: Option<usize>,
    group: Option<&str>,
) -> Result<Arc<Throttler>, ThrottleError> {
    match (capacity, group) {
        (Some(capacity), group) => Throttler::new(capacity, group),
        (None, Some(group)) => Throttler::lookup(group),
        (None, None) => Err(ThrottleError::InvalidArgument(
            "'group' or 'capacity' must be defined".to_string(),
        )),
    }
}

// ============================================================
//  🧪 Tests — the registry is process-wide and never forgets,
//  so every test brings its own group names. No sharing. No drama.
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// 🧪 Spawn way more callers than permits and make sure the room never gets crowded.
    #[test]
    fn the_one_where_the_bouncer_never_lets_more_than_capacity_inside() {
        let the_throttler = Throttler::new(3, None).expect("💀 capacity 3 is a fine capacity");
        let in_the_room = Arc::new(AtomicUsize::new(0));
        let the_high_water_mark = Arc::new(AtomicUsize::new(0));
        let total_visits = Arc::new(AtomicUsize::new(0));

        let the_guarded_fn = {
            let in_the_room = Arc::clone(&in_the_room);
            let the_high_water_mark = Arc::clone(&the_high_water_mark);
            let total_visits = Arc::clone(&total_visits);
            Arc::new(the_throttler.wrap(move |_: ()| {
                let now_inside = in_the_room.fetch_add(1, Ordering::SeqCst) + 1;
                the_high_water_mark.fetch_max(now_inside, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                in_the_room.fetch_sub(1, Ordering::SeqCst);
                total_visits.fetch_add(1, Ordering::SeqCst);
            }))
        };

        let the_crowd: Vec<_> = (0..12)
            .map(|_| {
                let the_guarded_fn = Arc::clone(&the_guarded_fn);
                thread::spawn(move || the_guarded_fn(()))
            })
            .collect();
        for caller in the_crowd {
            caller.join().expect("💀 a caller panicked in the queue");
        }

        let the_peak = the_high_water_mark.load(Ordering::SeqCst);
        assert!(the_peak <= 3, "peak concurrency {} blew past capacity 3", the_peak);
        assert!(the_peak >= 1);
        assert_eq!(total_visits.load(Ordering::SeqCst), 12);
        assert_eq!(the_throttler.available_permits(), 3);
    }

    #[test]
    fn the_one_where_the_second_io_group_gets_turned_away() {
        let the_original = Throttler::new(2, Some("test-dupe-io")).expect("💀 first one is free");

        let the_impostor = Throttler::new(5, Some("test-dupe-io"));
        assert_eq!(
            the_impostor.unwrap_err(),
            ThrottleError::DuplicateGroup {
                group: "test-dupe-io".to_string()
            }
        );

        // ✅ the first registration survived the attempted coup
        let the_survivor = Throttler::lookup("test-dupe-io").expect("💀 original went missing");
        assert!(Arc::ptr_eq(&the_original, &the_survivor));
        assert_eq!(the_survivor.capacity(), 2);
    }

    #[test]
    fn the_one_where_nobody_ever_registered_that_name() {
        let the_result = Throttler::lookup("test-never-registered");
        assert_eq!(
            the_result.unwrap_err(),
            ThrottleError::NotFound {
                group: "test-never-registered".to_string()
            }
        );
    }

    #[test]
    fn the_one_where_standalone_throttlers_stay_off_the_books() {
        let the_loner = Throttler::new(4, None).expect("💀 standalone build failed");
        assert_eq!(the_loner.group(), None);

        for name in registered_groups() {
            // -- another test may register between the snapshot and this lookup; ignore vanished names
            if let Ok(found) = Throttler::lookup(&name) {
                assert!(!Arc::ptr_eq(&found, &the_loner));
            }
        }
    }

    #[test]
    fn the_one_where_a_failing_call_still_gives_the_permit_back() {
        let the_throttler = Throttler::new(1, None).expect("💀 capacity 1 should build");
        let the_grumpy_fn = the_throttler.wrap(|reason: &str| -> Result<(), String> {
            Err(format!("nope: {}", reason))
        });

        assert_eq!(the_grumpy_fn("first"), Err("nope: first".to_string()));
        assert_eq!(the_throttler.available_permits(), 1);
        // 🔄 the next call gets in without waiting, capacity is 1 so a leak would hang here
        assert_eq!(the_grumpy_fn("second"), Err("nope: second".to_string()));
        assert_eq!(the_throttler.available_permits(), 1);
    }

    #[test]
    fn the_one_where_a_panic_unwinds_and_the_permit_comes_home_anyway() {
        let the_throttler = Throttler::new(1, None).expect("💀 capacity 1 should build");

        let the_outcome = catch_unwind(AssertUnwindSafe(|| {
            the_throttler.call(|| -> u8 { panic!("🧨 kaboom inside the throttled call") })
        }));

        assert!(the_outcome.is_err());
        assert_eq!(the_throttler.available_permits(), 1);
        assert_eq!(the_throttler.call(|| 42), 42);
    }

    #[test]
    fn the_one_where_the_factory_gets_handed_nothing() {
        let the_result = throttler(None, None);
        assert!(matches!(
            the_result,
            Err(ThrottleError::InvalidArgument(_))
        ));
    }

    #[test]
    fn the_one_where_zero_capacity_is_not_a_capacity() {
        assert!(matches!(
            Throttler::new(0, None),
            Err(ThrottleError::InvalidArgument(_))
        ));
        assert!(matches!(
            throttler(Some(0), Some("test-zero-capacity")),
            Err(ThrottleError::InvalidArgument(_))
        ));
        // ✅ a rejected build never reaches the registry
        assert!(Throttler::lookup("test-zero-capacity").is_err());
    }

    #[test]
    fn the_one_where_a_capacity_too_big_to_count_is_turned_away() {
        let the_result = Throttler::new(Semaphore::MAX_PERMITS + 1, Some("test-too-big-capacity"));
        assert!(matches!(
            the_result,
            Err(ThrottleError::InvalidArgument(msg)) if msg.contains("at most")
        ));
        // ✅ the registry never heard of it
        assert!(Throttler::lookup("test-too-big-capacity").is_err());

        // 🎯 right at the ceiling is still fine
        let the_biggest = Throttler::new(Semaphore::MAX_PERMITS, None)
            .expect("💀 MAX_PERMITS itself should build");
        assert_eq!(the_biggest.capacity(), Semaphore::MAX_PERMITS);
    }

    #[test]
    fn the_one_where_the_factory_hands_back_the_same_io_group() {
        let the_creator =
            throttler(Some(2), Some("test-factory-io")).expect("💀 create-and-register failed");
        let the_finder = throttler(None, Some("test-factory-io")).expect("💀 lookup failed");

        assert!(Arc::ptr_eq(&the_creator, &the_finder));

        // 🎟️ one headcount: a permit taken through one handle shows up on the other
        let _held = the_creator.acquire_blocking();
        assert_eq!(the_finder.available_permits(), 1);
    }

    #[test]
    fn the_one_where_the_factory_builds_a_loner_from_just_a_capacity() {
        let the_loner = throttler(Some(7), None).expect("💀 standalone factory path failed");
        assert_eq!(the_loner.capacity(), 7);
        assert_eq!(the_loner.group(), None);
    }

    #[test]
    fn the_one_where_is_locked_tells_the_truth_when_nobody_else_is_around() {
        let the_throttler = Throttler::new(1, None).expect("💀 capacity 1 should build");
        assert!(!the_throttler.is_locked());

        let the_permit = the_throttler.acquire_blocking();
        assert!(the_throttler.is_locked());
        assert_eq!(the_permit.num_permits(), 1);

        drop(the_permit);
        assert!(!the_throttler.is_locked());
    }

    /// 🧪 Eight threads, one name, one starting gun. Exactly one walks away with the group.
    #[test]
    fn the_one_where_eight_threads_race_for_one_name() {
        let the_starting_gun = Barrier::new(8);
        let the_winners = AtomicUsize::new(0);
        let the_losers = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    the_starting_gun.wait();
                    match Throttler::new(1, Some("test-race-for-the-name")) {
                        Ok(_) => the_winners.fetch_add(1, Ordering::SeqCst),
                        Err(ThrottleError::DuplicateGroup { .. }) => {
                            the_losers.fetch_add(1, Ordering::SeqCst)
                        }
                        Err(other) => panic!("💀 unexpected error in the race: {}", other),
                    };
                });
            }
        });

        assert_eq!(the_winners.load(Ordering::SeqCst), 1);
        assert_eq!(the_losers.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn the_one_where_tuples_ride_through_and_answers_come_back_untouched() {
        let the_throttler = Throttler::new(2, None).expect("💀 build failed");
        let the_adder = the_throttler.wrap(|(a, b): (i64, i64)| a + b);

        assert_eq!(the_adder((40, 2)), 42);
        assert_eq!(the_adder((-1, 1)), 0);
    }

    #[test]
    fn the_one_where_permits_remember_their_group() {
        let the_throttler =
            Throttler::new(1, Some("test-permit-group")).expect("💀 registration failed");
        let the_permit = the_throttler.acquire_blocking();
        assert_eq!(the_permit.group(), Some("test-permit-group"));
    }

    #[test]
    fn the_one_where_a_blocked_thread_wakes_when_the_permit_drops() {
        let the_throttler = Throttler::new(1, None).expect("💀 build failed");
        let the_held_permit = the_throttler.acquire_blocking();

        let the_waiter = {
            let the_throttler = Arc::clone(&the_throttler);
            thread::spawn(move || the_throttler.call(|| "finally in"))
        };

        thread::sleep(Duration::from_millis(30));
        drop(the_held_permit);

        assert_eq!(the_waiter.join().expect("💀 waiter panicked"), "finally in");
        assert_eq!(the_throttler.available_permits(), 1);
    }

    /// 🧪 The async road: same bouncer, same headcount, no parked threads.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn the_one_where_async_tasks_also_respect_the_headcount() {
        let the_throttler = Throttler::new(2, None).expect("💀 build failed");
        let in_the_room = Arc::new(AtomicUsize::new(0));
        let the_high_water_mark = Arc::new(AtomicUsize::new(0));

        let mut the_tasks = Vec::new();
        for _ in 0..8 {
            let the_throttler = Arc::clone(&the_throttler);
            let in_the_room = Arc::clone(&in_the_room);
            let the_high_water_mark = Arc::clone(&the_high_water_mark);
            the_tasks.push(tokio::spawn(async move {
                the_throttler
                    .run(async {
                        let now_inside = in_the_room.fetch_add(1, Ordering::SeqCst) + 1;
                        the_high_water_mark.fetch_max(now_inside, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(15)).await;
                        in_the_room.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }));
        }
        for task in the_tasks {
            task.await.expect("💀 async task panicked");
        }

        assert!(the_high_water_mark.load(Ordering::SeqCst) <= 2);
        assert_eq!(the_throttler.available_permits(), 2);
    }

    #[tokio::test]
    async fn the_one_where_async_and_blocking_share_one_semaphore() {
        let the_throttler = Throttler::new(2, None).expect("💀 build failed");

        let _async_permit = the_throttler.acquire().await;
        assert_eq!(the_throttler.available_permits(), 1);

        // ⚡ one permit left, so the blocking fast path never actually parks this worker
        let the_answer = the_throttler.call(|| "squeezed in");
        assert_eq!(the_answer, "squeezed in");
        assert_eq!(the_throttler.available_permits(), 1);
    }
}
