//! # Region Scheduler
//!
//! **Incremental, cancellable region rendering over many worlds**
//!
//! ## Architecture
//!
//! ```text
//!   add_regions ──┐                                   ┌──> Worker 1 ──┐
//!   watcher ──────┼──> [world A queue] (active) ──────┼──> Worker 2 ──┼──> RegionRenderer
//!   add_world ────┘    [world B queue] (waiting)      └──> Worker N ──┘        │
//!                                                                              v
//!                                              watchdog        ModificationTracker (checkpointed)
//! ```
//!
//! - One queue per world, drained in FIFO order of first enqueue. Only the
//!   world at the front is active; the pool is shared.
//! - A region is queued or running at most once per world.
//! - Pause stops workers from pulling new regions; in-flight regions finish.
//! - Cancel drops a world's queue immediately; in-flight regions finish.
//! - The watchdog cancels the active world if it makes no progress for the
//!   configured timeout.
//! - Expired cache entries are dropped when a run finishes and on every
//!   watcher tick.
//! - A region whose file time equals its tracked time is skipped without
//!   being loaded. Any other region is re-read from disk before rendering.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cartograph_world::{RegionPos, World};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use crate::config::SchedulerConfig;
use crate::error::{RenderError, RenderResult};
use crate::progress::{Progress, ProgressSnapshot};
use crate::renderer::RegionRenderer;
use crate::tracker::ModificationTracker;
use crate::watcher::RegionWatcher;

/// Something a status surface may want to report.
#[derive(Clone, Debug, PartialEq)]
pub enum SchedulerEvent {
    /// The first region of a run was pulled.
    WorldStarted {
        /// World name.
        world: String,
    },
    /// A region was unchanged since its last render.
    RegionSkipped {
        /// World name.
        world: String,
        /// Region.
        region: RegionPos,
    },
    /// A region was rendered.
    RegionFinished {
        /// World name.
        world: String,
        /// Region.
        region: RegionPos,
        /// Chunks present in the region.
        chunks: u64,
    },
    /// The renderer failed on a region.
    RegionFailed {
        /// World name.
        world: String,
        /// Region.
        region: RegionPos,
        /// Error message.
        error: String,
    },
    /// Every queued region of a run is done.
    WorldFinished {
        /// Final counters of the run.
        progress: ProgressSnapshot,
    },
    /// A run was cancelled, explicitly or by the stall watchdog.
    WorldCancelled {
        /// World name.
        world: String,
        /// Why.
        reason: String,
    },
}

/// Per-world queue state.
struct WorldEntry {
    world: Arc<World>,
    tracker: Arc<ModificationTracker>,
    queue: VecDeque<RegionPos>,
    queued: HashSet<RegionPos>,
    running: HashSet<RegionPos>,
    progress: Arc<Progress>,
    /// Has a run in `Queues::order`.
    in_run: bool,
    since_checkpoint: usize,
}

struct Queues {
    worlds: HashMap<String, WorldEntry>,
    /// Worlds with a run, front is active.
    order: VecDeque<String>,
    paused: bool,
    shutdown: bool,
}

/// One region handed to a worker.
struct Job {
    name: String,
    world: Arc<World>,
    tracker: Arc<ModificationTracker>,
    progress: Arc<Progress>,
    pos: RegionPos,
}

enum Outcome {
    Skipped,
    Rendered { chunks: u64 },
    Failed(RenderError),
}

struct Shared {
    config: SchedulerConfig,
    renderer: Arc<dyn RegionRenderer>,
    queues: Mutex<Queues>,
    wake: Condvar,
    events: Sender<SchedulerEvent>,
}

impl Shared {
    fn emit(&self, event: SchedulerEvent) {
        // The scheduler holds a receiver, so this cannot disconnect.
        let _ = self.events.send(event);
    }

    fn add_regions(&self, name: &str, regions: &[RegionPos]) -> RenderResult<usize> {
        let mut queues = self.queues.lock();
        let Queues { worlds, order, .. } = &mut *queues;
        let entry = worlds
            .get_mut(name)
            .ok_or_else(|| RenderError::UnknownWorld(name.to_owned()))?;

        let mut added = 0;
        for &pos in regions {
            if entry.running.contains(&pos) || !entry.queued.insert(pos) {
                continue;
            }
            entry.queue.push_back(pos);
            added += 1;
        }
        if added == 0 {
            return Ok(0);
        }

        if !entry.in_run {
            entry.in_run = true;
            entry.progress = Arc::new(Progress::new());
            entry.since_checkpoint = 0;
            order.push_back(name.to_owned());
        }
        entry.progress.add_regions(added as u64);
        self.wake.notify_all();
        Ok(added)
    }

    /// Pops the next region of the active world.
    fn next_job(&self, queues: &mut Queues) -> Option<Job> {
        if queues.paused || queues.shutdown {
            return None;
        }
        let name = queues.order.front()?;
        let entry = queues.worlds.get_mut(name)?;
        let pos = entry.queue.pop_front()?;
        entry.queued.remove(&pos);
        entry.running.insert(pos);

        if entry.progress.start() {
            tracing::info!(world = %name, regions = entry.queue.len() + 1, "world render started");
            self.emit(SchedulerEvent::WorldStarted { world: name.clone() });
        }
        entry.progress.touch();

        Some(Job {
            name: name.clone(),
            world: Arc::clone(&entry.world),
            tracker: Arc::clone(&entry.tracker),
            progress: Arc::clone(&entry.progress),
            pos,
        })
    }

    fn process(&self, job: &Job) -> Outcome {
        let modified = job.world.region_modified(job.pos);
        if modified.is_some() && job.tracker.get(job.pos) == modified {
            return Outcome::Skipped;
        }

        // The cached instance may predate the change that queued this job.
        let region = match job.world.store().refresh_region(job.pos) {
            Ok(region) => region,
            Err(_) => job.world.region(job.pos),
        };
        let chunks = region.chunk_count() as u64;
        job.progress.add_chunks(chunks);

        if let Err(error) = self.renderer.render_region(&job.world, &region) {
            return Outcome::Failed(error);
        }
        match modified {
            Some(millis) => job.tracker.set(job.pos, millis),
            None => {
                job.tracker.remove(job.pos);
            }
        }
        Outcome::Rendered { chunks }
    }

    fn complete(&self, job: &Job, outcome: Outcome) {
        let rendered = match outcome {
            Outcome::Skipped => {
                tracing::trace!(world = %job.name, region = %job.pos, "region unchanged, skipped");
                job.progress.region_skipped();
                self.emit(SchedulerEvent::RegionSkipped {
                    world: job.name.clone(),
                    region: job.pos,
                });
                false
            }
            Outcome::Rendered { chunks } => {
                job.progress.region_finished(chunks);
                self.emit(SchedulerEvent::RegionFinished {
                    world: job.name.clone(),
                    region: job.pos,
                    chunks,
                });
                true
            }
            Outcome::Failed(error) => {
                tracing::warn!(world = %job.name, region = %job.pos, %error, "region render failed");
                job.progress.region_failed();
                self.emit(SchedulerEvent::RegionFailed {
                    world: job.name.clone(),
                    region: job.pos,
                    error: error.to_string(),
                });
                false
            }
        };

        let mut checkpoint = false;
        let mut finished = None;
        {
            let mut queues = self.queues.lock();
            let Queues { worlds, order, .. } = &mut *queues;
            if let Some(entry) = worlds.get_mut(&job.name) {
                entry.running.remove(&job.pos);
                if rendered {
                    entry.since_checkpoint += 1;
                    let interval = self.config.checkpoint_interval;
                    if interval > 0 && entry.since_checkpoint >= interval {
                        entry.since_checkpoint = 0;
                        checkpoint = true;
                    }
                }
                if entry.in_run && entry.queue.is_empty() && entry.running.is_empty() {
                    entry.in_run = false;
                    order.retain(|name| name != &job.name);
                    finished = Some(entry.progress.snapshot(&job.name));
                }
            }
            self.wake.notify_all();
        }

        if checkpoint || finished.is_some() {
            save_tracker(&job.name, &job.tracker);
        }
        if let Some(progress) = finished {
            job.world.store().evict_expired();
            tracing::info!(
                world = %progress.world,
                regions = progress.regions_done,
                skipped = progress.regions_skipped,
                failed = progress.regions_failed,
                chunks = progress.chunks_done,
                elapsed = ?progress.elapsed,
                "world render finished"
            );
            self.emit(SchedulerEvent::WorldFinished { progress });
        }
    }

    /// Ends a world's run. In-flight regions are left to finish.
    fn cancel(&self, name: &str, reason: &str) -> RenderResult<bool> {
        let (tracker, dropped) = {
            let mut queues = self.queues.lock();
            let Queues { worlds, order, .. } = &mut *queues;
            let entry = worlds
                .get_mut(name)
                .ok_or_else(|| RenderError::UnknownWorld(name.to_owned()))?;
            if !entry.in_run {
                return Ok(false);
            }
            let dropped = entry.queue.len();
            entry.queue.clear();
            entry.queued.clear();
            entry.in_run = false;
            order.retain(|n| n != name);
            self.wake.notify_all();
            (Arc::clone(&entry.tracker), dropped)
        };

        tracing::info!(world = %name, dropped, %reason, "world render cancelled");
        save_tracker(name, &tracker);
        self.emit(SchedulerEvent::WorldCancelled {
            world: name.to_owned(),
            reason: reason.to_owned(),
        });
        Ok(true)
    }

    fn notify_region_changed(&self, name: &str, pos: RegionPos) -> RenderResult<bool> {
        let world = {
            let queues = self.queues.lock();
            let entry = queues
                .worlds
                .get(name)
                .ok_or_else(|| RenderError::UnknownWorld(name.to_owned()))?;
            Arc::clone(&entry.world)
        };
        // A failed refresh keeps the last good region cached.
        if world.store().is_cached(pos) {
            let _ = world.store().refresh_region(pos);
        }
        let requeued = self.add_regions(name, &[pos])? > 0;
        tracing::debug!(world = %name, region = %pos, requeued, "region changed on disk");
        Ok(requeued)
    }

    fn worker_loop(&self) {
        loop {
            let job = {
                let mut queues = self.queues.lock();
                loop {
                    if queues.shutdown {
                        return;
                    }
                    if let Some(job) = self.next_job(&mut queues) {
                        break job;
                    }
                    self.wake.wait(&mut queues);
                }
            };
            let outcome = self.process(&job);
            self.complete(&job, outcome);
        }
    }

    fn watchdog_loop(&self, timeout: Duration) {
        let tick = (timeout / 4).clamp(Duration::from_millis(10), Duration::from_secs(1));
        loop {
            let active = {
                let mut queues = self.queues.lock();
                if queues.shutdown {
                    return;
                }
                self.wake.wait_for(&mut queues, tick);
                if queues.shutdown {
                    return;
                }
                if queues.paused {
                    continue;
                }
                let active = queues.order.front().and_then(|name| {
                    let progress = &queues.worlds.get(name)?.progress;
                    Some((name.clone(), progress.is_started(), progress.idle()))
                });
                drop(queues);
                active
            };

            let Some((world, started, idle)) = active else {
                continue;
            };
            if started && idle >= timeout {
                tracing::warn!(%world, ?idle, "render stalled, cancelling");
                let reason = RenderError::StallTimeout {
                    world: world.clone(),
                    idle,
                }
                .to_string();
                let _ = self.cancel(&world, &reason);
            }
        }
    }

    fn watch_loop(&self, interval: Duration) {
        let mut watcher = RegionWatcher::new();
        loop {
            let worlds: Vec<(String, Arc<World>)> = {
                let queues = self.queues.lock();
                if queues.shutdown {
                    return;
                }
                queues
                    .worlds
                    .iter()
                    .map(|(name, entry)| (name.clone(), Arc::clone(&entry.world)))
                    .collect()
            };
            for (name, world) in worlds {
                world.store().evict_expired();
                for pos in watcher.poll(&world) {
                    let _ = self.notify_region_changed(&name, pos);
                }
            }

            let deadline = Instant::now() + interval;
            let mut queues = self.queues.lock();
            while !queues.shutdown && Instant::now() < deadline {
                self.wake.wait_until(&mut queues, deadline);
            }
            if queues.shutdown {
                return;
            }
        }
    }
}

fn save_tracker(world: &str, tracker: &ModificationTracker) {
    if let Err(error) = tracker.save_if_dirty() {
        tracing::warn!(%world, path = %tracker.path().display(), %error, "tracker save failed");
    }
}

/// Worker pool draining per-world region queues.
pub struct RenderScheduler {
    shared: Arc<Shared>,
    events: Receiver<SchedulerEvent>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl RenderScheduler {
    /// Starts the workers, the stall watchdog and the region watcher.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if a thread cannot be spawned.
    pub fn new(config: SchedulerConfig, renderer: impl RegionRenderer + 'static) -> RenderResult<Self> {
        let (sender, events) = crossbeam_channel::unbounded();
        let workers = config.workers();
        let stall_timeout = config.stall_timeout();
        let watch_interval = config.watch_interval();

        let shared = Arc::new(Shared {
            config,
            renderer: Arc::new(renderer),
            queues: Mutex::new(Queues {
                worlds: HashMap::new(),
                order: VecDeque::new(),
                paused: false,
                shutdown: false,
            }),
            wake: Condvar::new(),
            events: sender,
        });
        let scheduler = Self {
            shared,
            events,
            threads: Mutex::new(Vec::new()),
        };

        for i in 0..workers {
            scheduler.spawn(format!("cartograph-worker-{i}"), Shared::worker_loop)?;
        }
        if let Some(timeout) = stall_timeout {
            scheduler.spawn("cartograph-watchdog".to_owned(), move |shared| shared.watchdog_loop(timeout))?;
        }
        if let Some(interval) = watch_interval {
            scheduler.spawn("cartograph-watcher".to_owned(), move |shared| shared.watch_loop(interval))?;
        }
        tracing::debug!(workers, "render scheduler started");
        Ok(scheduler)
    }

    fn spawn(&self, name: String, body: impl FnOnce(&Shared) + Send + 'static) -> RenderResult<()> {
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new().name(name).spawn(move || body(&shared))?;
        self.threads.lock().push(handle);
        Ok(())
    }

    /// Registers a world and loads its tracker. Returns false if a world
    /// with this name is already registered.
    pub fn register_world(&self, world: Arc<World>) -> bool {
        let name = world.name().to_owned();
        let mut queues = self.shared.queues.lock();
        if queues.worlds.contains_key(&name) {
            return false;
        }
        let tracker = ModificationTracker::open(self.shared.config.tracker_path(&name));
        tracing::info!(world = %name, tracked = tracker.len(), "world registered");
        queues.worlds.insert(
            name,
            WorldEntry {
                world,
                tracker: Arc::new(tracker),
                queue: VecDeque::new(),
                queued: HashSet::new(),
                running: HashSet::new(),
                progress: Arc::new(Progress::new()),
                in_run: false,
                since_checkpoint: 0,
            },
        );
        true
    }

    /// Queues every region file of a world. Returns the number newly queued.
    ///
    /// # Errors
    ///
    /// [`RenderError::UnknownWorld`] if the world is not registered,
    /// [`RenderError::Io`] if its region directory cannot be listed.
    pub fn add_world(&self, name: &str) -> RenderResult<usize> {
        let world = self.world(name)?;
        let regions = world.list_regions()?;
        self.add_regions(name, &regions)
    }

    /// Merges regions into a world's queue. Regions already queued or
    /// running are ignored. Returns the number newly queued.
    ///
    /// # Errors
    ///
    /// [`RenderError::UnknownWorld`] if the world is not registered.
    pub fn add_regions(&self, name: &str, regions: &[RegionPos]) -> RenderResult<usize> {
        self.shared.add_regions(name, regions)
    }

    /// Refreshes a changed region in the cache and requeues it.
    ///
    /// # Errors
    ///
    /// [`RenderError::UnknownWorld`] if the world is not registered.
    pub fn notify_region_changed(&self, name: &str, pos: RegionPos) -> RenderResult<bool> {
        self.shared.notify_region_changed(name, pos)
    }

    /// Cancels a world's run. Returns false if it had none.
    ///
    /// # Errors
    ///
    /// [`RenderError::UnknownWorld`] if the world is not registered.
    pub fn cancel(&self, name: &str) -> RenderResult<bool> {
        self.shared.cancel(name, "cancelled")
    }

    /// Returns true if workers are held.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.shared.queues.lock().paused
    }

    /// Holds or releases the workers.
    pub fn set_paused(&self, paused: bool) {
        let mut queues = self.shared.queues.lock();
        if queues.paused == paused {
            return;
        }
        queues.paused = paused;
        if !paused {
            // Time spent paused is not a stall.
            for name in &queues.order {
                if let Some(entry) = queues.worlds.get(name) {
                    entry.progress.touch();
                }
            }
        }
        tracing::info!(paused, "render scheduler pause toggled");
        self.shared.wake.notify_all();
    }

    /// Progress of the active world.
    #[must_use]
    pub fn get_progress(&self) -> Option<ProgressSnapshot> {
        let queues = self.shared.queues.lock();
        let name = queues.order.front()?;
        Some(queues.worlds.get(name)?.progress.snapshot(name))
    }

    /// Progress of a world's current run.
    #[must_use]
    pub fn world_progress(&self, name: &str) -> Option<ProgressSnapshot> {
        let queues = self.shared.queues.lock();
        let entry = queues.worlds.get(name)?;
        entry.in_run.then(|| entry.progress.snapshot(name))
    }

    /// Worlds with queued work that have not started yet, in FIFO order.
    #[must_use]
    pub fn get_queued_worlds(&self) -> Vec<String> {
        let queues = self.shared.queues.lock();
        queues
            .order
            .iter()
            .filter(|name| {
                queues
                    .worlds
                    .get(*name)
                    .is_some_and(|entry| !entry.progress.is_started())
            })
            .cloned()
            .collect()
    }

    /// Regions waiting in a world's queue.
    #[must_use]
    pub fn queued_regions(&self, name: &str) -> usize {
        self.shared
            .queues
            .lock()
            .worlds
            .get(name)
            .map_or(0, |entry| entry.queue.len())
    }

    /// Returns true if no world has queued or running regions.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let queues = self.shared.queues.lock();
        queues.order.is_empty() && queues.worlds.values().all(|entry| entry.running.is_empty())
    }

    /// A registered world's tracker.
    #[must_use]
    pub fn tracker(&self, name: &str) -> Option<Arc<ModificationTracker>> {
        let queues = self.shared.queues.lock();
        queues.worlds.get(name).map(|entry| Arc::clone(&entry.tracker))
    }

    /// Event stream. Every clone sees each event once between them.
    #[must_use]
    pub fn events(&self) -> Receiver<SchedulerEvent> {
        self.events.clone()
    }

    fn world(&self, name: &str) -> RenderResult<Arc<World>> {
        let queues = self.shared.queues.lock();
        queues
            .worlds
            .get(name)
            .map(|entry| Arc::clone(&entry.world))
            .ok_or_else(|| RenderError::UnknownWorld(name.to_owned()))
    }

    /// Stops every thread after its current region and saves all trackers.
    pub fn shutdown(&self) {
        {
            let mut queues = self.shared.queues.lock();
            queues.shutdown = true;
            self.shared.wake.notify_all();
        }

        let handles = std::mem::take(&mut *self.threads.lock());
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("scheduler thread panicked");
            }
        }

        let trackers: Vec<(String, Arc<ModificationTracker>)> = {
            let queues = self.shared.queues.lock();
            queues
                .worlds
                .iter()
                .map(|(name, entry)| (name.clone(), Arc::clone(&entry.tracker)))
                .collect()
        };
        for (name, tracker) in trackers {
            save_tracker(&name, &tracker);
        }
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RenderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queues = self.shared.queues.lock();
        f.debug_struct("RenderScheduler")
            .field("worlds", &queues.worlds.len())
            .field("order", &queues.order)
            .field("paused", &queues.paused)
            .finish_non_exhaustive()
    }
}
