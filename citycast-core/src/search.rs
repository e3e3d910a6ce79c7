//! The search pipeline.
//!
//! A [`Dashboard`] owns one event-loop task. `search` only queues a command;
//! the loop starts the fetches as separate tasks, which report back over a
//! channel tagged with the generation of the search that started them.
//! Completions from an older generation are dropped, so overlapping searches
//! cannot overwrite a newer result. All state changes happen on the loop and
//! reach observers as whole [`SearchState`] snapshots through a watch channel.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::{
    clock::{ClockSlot, SystemClock, TimeSource, format_time_of_day},
    config::Config,
    error::{FetchError, SearchError},
    forecast::project,
    images::select_images,
    model::{CityImage, CurrentConditions, ForecastSample, Notice, Region},
    source::Sources,
    state::SearchState,
};

#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Searched as soon as the dashboard starts.
    pub default_city: Option<String>,
    pub image_count: usize,
    pub time: Arc<dyn TimeSource>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_city: None,
            image_count: 4,
            time: Arc::new(SystemClock),
        }
    }
}

impl SearchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_city: config.default_city().map(str::to_string),
            image_count: config.image_count,
            ..Self::default()
        }
    }
}

/// Trimmed place name, or [`SearchError::InvalidInput`] when it is blank.
pub fn validate_place(place: &str) -> Result<&str, SearchError> {
    let place = place.trim();
    if place.is_empty() {
        Err(SearchError::InvalidInput)
    } else {
        Ok(place)
    }
}

#[derive(Debug)]
enum Command {
    Search(String),
    Shutdown,
}

#[derive(Debug)]
enum Completion {
    Conditions {
        generation: u64,
        place: String,
        result: Result<CurrentConditions, FetchError>,
    },
    Forecast {
        generation: u64,
        result: Result<Vec<ForecastSample>, FetchError>,
    },
    Images {
        generation: u64,
        result: Result<Vec<CityImage>, FetchError>,
    },
    Tick {
        clock: u64,
        text: String,
    },
}

/// Fetches of the current generation that have not reported yet.
#[derive(Debug, Default, Clone, Copy)]
struct Pending {
    conditions: bool,
    forecast: bool,
    images: bool,
}

impl Pending {
    fn is_empty(&self) -> bool {
        !(self.conditions || self.forecast || self.images)
    }
}

/// Handle to a running search pipeline.
///
/// Dropping the handle stops the pipeline the same way [`Dashboard::shutdown`] does,
/// without waiting for it.
#[derive(Debug)]
pub struct Dashboard {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SearchState>,
    task: JoinHandle<()>,
    /// A search was queued, by `search` or through the default city.
    searched: AtomicBool,
}

impl Dashboard {
    /// Start the pipeline on the current tokio runtime.
    pub fn spawn(sources: Sources, settings: SearchSettings) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (completions, completion_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SearchState::default());

        let searched = AtomicBool::new(settings.default_city.is_some());
        if let Some(city) = settings.default_city.clone() {
            let _ = commands.send(Command::Search(city));
        }

        let orchestrator = Orchestrator {
            sources,
            settings,
            commands: command_rx,
            completions,
            completion_rx,
            state: state_tx,
            generation: 0,
            pending: Pending::default(),
            clock: ClockSlot::new(),
            clock_id: 0,
            tasks: JoinSet::new(),
        };

        let task = tokio::spawn(orchestrator.run());

        Self { commands, state, task, searched }
    }

    /// Queue a search. Blank input only raises [`Notice::EmptyQuery`].
    pub fn search(&self, place: impl Into<String>) {
        self.searched.store(true, Ordering::Release);
        if self.commands.send(Command::Search(place.into())).is_err() {
            tracing::warn!("search ignored, dashboard has stopped");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Wait until the latest search has no outstanding fetches.
    ///
    /// On a dashboard that was never asked to search this is the current snapshot.
    pub async fn settled(&self) -> SearchState {
        if !self.searched.load(Ordering::Acquire) {
            return self.snapshot();
        }

        let mut rx = self.state.clone();
        let result = rx
            .wait_for(|s| s.is_settled() && (s.generation > 0 || s.notice.is_some()))
            .await
            .map(|s| s.clone());

        match result {
            Ok(state) => state,
            Err(_) => self.snapshot(),
        }
    }

    /// Stop the loop, abort outstanding fetches and cancel the clock.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(err) = self.task.await {
            tracing::warn!(%err, "dashboard task ended abnormally");
        }
    }
}

struct Orchestrator {
    sources: Sources,
    settings: SearchSettings,
    commands: mpsc::UnboundedReceiver<Command>,
    completions: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    state: watch::Sender<SearchState>,
    generation: u64,
    pending: Pending,
    clock: ClockSlot,
    clock_id: u64,
    tasks: JoinSet<()>,
}

impl Orchestrator {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Search(place)) => self.search(&place),
                    Some(Command::Shutdown) | None => break,
                },
                Some(done) = self.completion_rx.recv() => self.complete(done),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(err) = joined {
                        if err.is_panic() {
                            tracing::error!(%err, "fetch task panicked");
                        }
                    }
                }
            }
        }

        self.clock.cancel();
        self.tasks.abort_all();
        tracing::debug!("dashboard stopped");
    }

    fn search(&mut self, place: &str) {
        let place = match validate_place(place) {
            Ok(place) => place,
            Err(err) => {
                tracing::info!(%err, "search rejected");
                self.state.send_modify(|s| {
                    s.notice = Some(Notice::EmptyQuery);
                    s.revision += 1;
                });
                return;
            }
        };

        self.generation += 1;
        let generation = self.generation;
        tracing::info!(place, generation, "searching");

        self.pending = Pending { conditions: true, forecast: false, images: true };
        self.state.send_modify(|s| {
            s.begin(place, generation);
            s.revision += 1;
        });

        self.spawn_conditions(place, generation);
        self.spawn_images(place, generation);
    }

    fn spawn_conditions(&mut self, place: &str, generation: u64) {
        let weather = Arc::clone(&self.sources.weather);
        let tx = self.completions.clone();
        let place = place.to_string();

        self.tasks.spawn(async move {
            let result = weather.current(&place).await;
            let _ = tx.send(Completion::Conditions { generation, place, result });
        });
    }

    fn spawn_forecast(&mut self, place: &str, generation: u64) {
        let forecast = Arc::clone(&self.sources.forecast);
        let tx = self.completions.clone();
        let place = place.to_string();

        self.tasks.spawn(async move {
            let result = forecast.forecast(&place).await.map(|raw| project(&raw));
            let _ = tx.send(Completion::Forecast { generation, result });
        });
    }

    fn spawn_images(&mut self, place: &str, generation: u64) {
        let images = Arc::clone(&self.sources.images);
        let tx = self.completions.clone();
        let place = place.to_string();
        let count = self.settings.image_count;

        self.tasks.spawn(async move {
            let result = images
                .images(&place)
                .await
                .map(|pool| select_images(&pool, count, &mut rand::thread_rng()));
            let _ = tx.send(Completion::Images { generation, result });
        });
    }

    fn complete(&mut self, done: Completion) {
        match done {
            Completion::Conditions { generation, place, result } => {
                if self.is_stale(generation, Region::Conditions) {
                    return;
                }
                self.pending.conditions = false;
                self.apply_conditions(&place, generation, result);
            }
            Completion::Forecast { generation, result } => {
                if self.is_stale(generation, Region::Forecast) {
                    return;
                }
                self.pending.forecast = false;
                match result {
                    Ok(samples) => self.publish(|s| s.forecast = samples),
                    Err(err) => {
                        tracing::warn!(%err, "forecast fetch failed");
                        self.publish(|s| {
                            s.forecast.clear();
                            s.raise(Notice::Unavailable(Region::Forecast));
                        });
                    }
                }
            }
            Completion::Images { generation, result } => {
                if self.is_stale(generation, Region::Images) {
                    return;
                }
                self.pending.images = false;
                match result {
                    Ok(images) => self.publish(|s| s.images = images),
                    Err(err) => {
                        tracing::warn!(%err, "image fetch failed");
                        self.publish(|s| {
                            s.images.clear();
                            s.raise(Notice::Unavailable(Region::Images));
                        });
                    }
                }
            }
            Completion::Tick { clock, text } => {
                if clock != self.clock_id || !self.clock.is_running() {
                    tracing::trace!(clock, "tick from a replaced clock dropped");
                    return;
                }
                self.state.send_modify(|s| s.local_time = Some(text));
            }
        }
    }

    fn apply_conditions(
        &mut self,
        place: &str,
        generation: u64,
        result: Result<CurrentConditions, FetchError>,
    ) {
        match result {
            Ok(conditions) => {
                let offset = conditions.utc_offset_seconds;
                tracing::debug!(location = %conditions.location_name, offset, "conditions loaded");

                self.sync_clock(Some(offset));
                let local_time = format_time_of_day(self.settings.time.now_utc(), offset);
                self.pending.forecast = true;
                self.publish(|s| s.set_conditions(conditions, local_time));
                self.spawn_forecast(place, generation);
            }
            Err(FetchError::NotFound { place }) => {
                tracing::info!(%place, "place not found");
                self.sync_clock(None);
                self.publish(|s| {
                    s.clear_conditions();
                    s.raise(Notice::NotFound(place));
                });
            }
            Err(err) => {
                tracing::warn!(%err, "current conditions fetch failed");
                self.publish(|s| s.raise(Notice::Unavailable(Region::Conditions)));
            }
        }
    }

    /// Restart the clock when the offset changes, stop it when there is none.
    fn sync_clock(&mut self, offset: Option<i32>) {
        match offset {
            Some(offset) if self.clock.offset_seconds() == Some(offset) => {}
            Some(offset) => {
                self.clock_id += 1;
                let clock = self.clock_id;
                let tx = self.completions.clone();
                self.clock.restart(offset, Arc::clone(&self.settings.time), move |text| {
                    let _ = tx.send(Completion::Tick { clock, text });
                });
                tracing::debug!(clock, offset, "clock restarted");
            }
            None => self.clock.cancel(),
        }
    }

    fn is_stale(&self, generation: u64, region: Region) -> bool {
        let stale = generation != self.generation;
        if stale {
            tracing::debug!(generation, current = self.generation, %region, "stale completion dropped");
        }
        stale
    }

    /// Apply one field-group update and settle the search, as a single notification.
    fn publish<F>(&mut self, update: F)
    where
        F: FnOnce(&mut SearchState),
    {
        let settled = self.pending.is_empty();
        self.state.send_modify(|s| {
            update(s);
            if settled {
                s.query_in_flight = None;
            }
            s.revision += 1;
        });
    }
}
