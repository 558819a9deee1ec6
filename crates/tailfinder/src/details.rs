//! The details view controller.
//!
//! Each navigation to a details route starts one lookup and a cosmetic
//! progress ticker that climbs to a ceiling while the request is in flight.
//! Both run in a single spawned task that reports back over a channel.
//!
//! Updates carry the generation they were started under. Navigating again
//! bumps the generation and aborts the old task, and any update that still
//! arrives from an older generation is dropped, so a slow response for a
//! superseded lookup can never overwrite the current one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{debug, trace};

use crate::classify::{classify, LookupError};
use crate::client::{AircraftRecord, LookupClient, LookupRequest};

/// Timing of the cosmetic progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSettings {
    /// Percent added per tick.
    pub step: u8,
    /// Progress never passes this until the response arrives.
    pub ceiling: u8,
    /// Time between ticks.
    pub tick: Duration,
    /// Pause at 100% before showing the result.
    pub settle: Duration,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            step: 10,
            ceiling: 90,
            tick: Duration::from_millis(400),
            settle: Duration::from_millis(400),
        }
    }
}

/// What the details view is showing.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// Waiting for the lookup; `progress` is 0-100.
    Loading {
        /// Cosmetic progress percentage.
        progress: u8,
    },
    /// The aircraft was found.
    Success(Box<AircraftRecord>),
    /// The lookup failed.
    Failed(LookupError),
}

impl ViewState {
    /// Whether the view has reached a final state.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Loading { .. })
    }
}

#[derive(Debug)]
enum Event {
    Progress(u8),
    Settled(Result<AircraftRecord, LookupError>),
}

#[derive(Debug)]
struct Update {
    generation: u64,
    event: Event,
}

/// Drives one details view through `Loading -> Success | Failed`.
///
/// Must be used from within a tokio runtime.
pub struct DetailsView {
    client: Arc<dyn LookupClient>,
    settings: ProgressSettings,
    today: Option<NaiveDate>,
    generation: u64,
    request: LookupRequest,
    state: ViewState,
    cancelled: bool,
    tx: mpsc::UnboundedSender<Update>,
    rx: mpsc::UnboundedReceiver<Update>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for DetailsView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailsView")
            .field("generation", &self.generation)
            .field("request", &self.request)
            .field("state", &self.state)
            .field("cancelled", &self.cancelled)
            .finish_non_exhaustive()
    }
}

impl DetailsView {
    /// Open the view for `request` and start loading.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn open(
        client: Arc<dyn LookupClient>,
        settings: ProgressSettings,
        request: LookupRequest,
    ) -> Self {
        Self::open_with_today(client, settings, request, None)
    }

    /// Like [`DetailsView::open`], measuring future dates from a fixed day
    /// instead of the local calendar.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn open_with_today(
        client: Arc<dyn LookupClient>,
        settings: ProgressSettings,
        request: LookupRequest,
        today: Option<NaiveDate>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut view = Self {
            client,
            settings,
            today,
            generation: 0,
            request,
            state: ViewState::Loading { progress: 0 },
            cancelled: false,
            tx,
            rx,
            task: None,
        };
        view.start();
        view
    }

    /// Switch to `request`. The pending lookup, if any, is abandoned.
    ///
    /// Returns `false` (and keeps the current lookup) when the parameters
    /// did not change.
    pub fn navigate(&mut self, request: LookupRequest) -> bool {
        if request == self.request {
            return false;
        }
        debug!(
            "Superseding lookup {} with {}",
            self.generation,
            self.generation + 1
        );
        self.request = request;
        self.start();
        true
    }

    /// Stop the pending lookup and timer. Later updates are ignored and
    /// [`DetailsView::next_update`] returns `None` until the next
    /// navigation.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.cancelled = true;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Whether the current lookup was cancelled before it settled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled && !self.state.is_settled()
    }

    /// Parameters of the current lookup.
    #[must_use]
    pub fn request(&self) -> &LookupRequest {
        &self.request
    }

    /// Wait for the next change to the current lookup's state.
    ///
    /// Returns `None` once the view has settled or was cancelled.
    pub async fn next_update(&mut self) -> Option<&ViewState> {
        while !self.cancelled && !self.state.is_settled() {
            let update = self.rx.recv().await?;
            if self.apply(update) {
                return Some(&self.state);
            }
        }
        None
    }

    /// Wait until the view settles, calling `on_change` for every state
    /// change along the way.
    pub async fn run_to_completion<F>(&mut self, mut on_change: F) -> &ViewState
    where
        F: FnMut(&ViewState),
    {
        while let Some(state) = self.next_update().await {
            on_change(state);
        }
        &self.state
    }

    fn start(&mut self) {
        self.cancel();
        self.cancelled = false;
        self.state = ViewState::Loading { progress: 0 };

        let generation = self.generation;
        let client = Arc::clone(&self.client);
        let request = self.request.clone();
        let settings = self.settings;
        let today = self.today;
        let tx = self.tx.clone();

        debug!("Starting lookup {} for {}", generation, request.flight_number);
        self.task = Some(tokio::spawn(async move {
            run_lookup(client, request, settings, today, generation, tx).await;
        }));
    }

    /// Apply `update` if it belongs to the current generation.
    fn apply(&mut self, update: Update) -> bool {
        if update.generation != self.generation {
            debug!(
                "Discarding update from superseded lookup {} (current {})",
                update.generation, self.generation
            );
            return false;
        }
        if self.state.is_settled() {
            return false;
        }

        self.state = match update.event {
            Event::Progress(progress) => ViewState::Loading { progress },
            Event::Settled(Ok(record)) => ViewState::Success(Box::new(record)),
            Event::Settled(Err(error)) => ViewState::Failed(error),
        };
        true
    }
}

impl Drop for DetailsView {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_lookup(
    client: Arc<dyn LookupClient>,
    request: LookupRequest,
    settings: ProgressSettings,
    today: Option<NaiveDate>,
    generation: u64,
    tx: mpsc::UnboundedSender<Update>,
) {
    let send = |event: Event| tx.send(Update { generation, event }).is_ok();

    let lookup = client.lookup(&request);
    tokio::pin!(lookup);

    let mut ticker = interval_at(Instant::now() + settings.tick, settings.tick);
    let mut progress: u8 = 0;

    let outcome = loop {
        tokio::select! {
            outcome = &mut lookup => break outcome,
            _ = ticker.tick() => {
                progress = progress.saturating_add(settings.step).min(settings.ceiling);
                trace!("Lookup {} progress {}%", generation, progress);
                if !send(Event::Progress(progress)) {
                    return;
                }
            }
        }
    };

    if !send(Event::Progress(100)) {
        return;
    }
    sleep(settings.settle).await;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let outcome = outcome.map_err(|failure| classify(&failure, &request, today));
    send(Event::Settled(outcome));
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use tokio::sync::oneshot;

    use crate::client::{ErrorBody, FlightLeg, LookupFailure};
    use crate::provider::Provider;

    type Reply = Result<AircraftRecord, LookupFailure>;

    /// Answers each flight number once, when the test releases it.
    struct ScriptedClient {
        pending: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
    }

    impl ScriptedClient {
        fn new(flights: &[&str]) -> (Arc<Self>, HashMap<String, oneshot::Sender<Reply>>) {
            crate::logging::init_test_logging();
            let mut pending = HashMap::new();
            let mut senders = HashMap::new();
            for flight in flights {
                let (tx, rx) = oneshot::channel();
                pending.insert((*flight).to_string(), rx);
                senders.insert((*flight).to_string(), tx);
            }
            let client = Arc::new(Self {
                pending: Mutex::new(pending),
            });
            (client, senders)
        }
    }

    #[async_trait::async_trait]
    impl LookupClient for ScriptedClient {
        async fn lookup(&self, request: &LookupRequest) -> Reply {
            let rx = self
                .pending
                .lock()
                .unwrap()
                .remove(&request.flight_number);
            match rx {
                Some(rx) => rx.await.unwrap_or_else(|_| {
                    Err(LookupFailure::Transport {
                        message: "script dropped".to_string(),
                    })
                }),
                None => Err(LookupFailure::Transport {
                    message: "unscripted".to_string(),
                }),
            }
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn request(flight: &str, provider: Provider, days_ahead: i64) -> LookupRequest {
        LookupRequest {
            flight_number: flight.to_string(),
            date: today() + chrono::Duration::days(days_ahead),
            provider,
        }
    }

    fn record(flight: &str) -> AircraftRecord {
        AircraftRecord {
            airline: "Test Air".to_string(),
            flight_number: flight.to_string(),
            status: "Scheduled".to_string(),
            registration: "G-TEST".to_string(),
            model: "Airbus A320".to_string(),
            data_source: "AeroDataBox".to_string(),
            aircraft_age: None,
            distance: None,
            departure: FlightLeg::default(),
            arrival: FlightLeg::default(),
        }
    }

    fn rejected(message: &str) -> Reply {
        Err(LookupFailure::Rejected {
            status: 404,
            body: ErrorBody {
                message: Some(message.to_string()),
                code: None,
            },
        })
    }

    fn fast() -> ProgressSettings {
        ProgressSettings {
            step: 10,
            ceiling: 90,
            tick: Duration::from_millis(400),
            settle: Duration::from_millis(400),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_lifecycle() {
        let (client, mut senders) = ScriptedClient::new(&["BA123"]);
        let mut view = DetailsView::open_with_today(
            client,
            fast(),
            request("BA123", Provider::AeroDataBox, 1),
            Some(today()),
        );
        assert_eq!(view.state(), &ViewState::Loading { progress: 0 });

        senders
            .remove("BA123")
            .unwrap()
            .send(Ok(record("BA123")))
            .unwrap();

        let mut seen = Vec::new();
        let final_state = view.run_to_completion(|s| seen.push(s.clone())).await;

        assert_eq!(final_state, &ViewState::Success(Box::new(record("BA123"))));
        assert!(seen.contains(&ViewState::Loading { progress: 100 }));
        assert!(view.next_update().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_climbs_to_ceiling() {
        let (client, mut senders) = ScriptedClient::new(&["BA123"]);
        let mut view = DetailsView::open_with_today(
            client,
            fast(),
            request("BA123", Provider::AeroDataBox, 1),
            Some(today()),
        );

        let mut progress = Vec::new();
        for _ in 0..12 {
            match view.next_update().await {
                Some(ViewState::Loading { progress: p }) => progress.push(*p),
                other => panic!("unexpected state {other:?}"),
            }
        }
        assert_eq!(progress, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 90, 90, 90]);

        senders
            .remove("BA123")
            .unwrap()
            .send(Ok(record("BA123")))
            .unwrap();
        let state = view.run_to_completion(|_| {}).await;
        assert!(matches!(state, ViewState::Success(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_finalized_is_rendered_for_alternate_provider() {
        let (client, mut senders) = ScriptedClient::new(&["BA123"]);
        let mut view = DetailsView::open_with_today(
            client,
            fast(),
            request("BA123", Provider::FlightAware, 3),
            Some(today()),
        );
        senders
            .remove("BA123")
            .unwrap()
            .send(rejected("Sorry, aircraft assignment may not be finalized"))
            .unwrap();

        let state = view.run_to_completion(|_| {}).await;
        assert_eq!(state, &ViewState::Failed(LookupError::NotFinalized));
    }

    #[tokio::test(start_paused = true)]
    async fn test_future_date_hint_for_alternate_provider() {
        let (client, mut senders) = ScriptedClient::new(&["BA123"]);
        let mut view = DetailsView::open_with_today(
            client,
            fast(),
            request("BA123", Provider::FlightAware, 10),
            Some(today()),
        );
        senders
            .remove("BA123")
            .unwrap()
            .send(rejected("No flight found"))
            .unwrap();

        let state = view.run_to_completion(|_| {}).await;
        let ViewState::Failed(error) = state else {
            panic!("expected failure, got {state:?}");
        };
        let text = error.to_string();
        assert!(text.contains("10 days in the future"));
        assert!(text.contains("AeroDataBox API"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_for_superseded_lookup_is_ignored() {
        let (client, mut senders) = ScriptedClient::new(&["AA1", "BB2"]);
        let mut view = DetailsView::open_with_today(
            client,
            fast(),
            request("AA1", Provider::AeroDataBox, 1),
            Some(today()),
        );

        // Let the first lookup get going before superseding it.
        assert!(view.next_update().await.is_some());
        assert!(view.navigate(request("BB2", Provider::AeroDataBox, 1)));

        // The newer request resolves first, the older one afterwards.
        senders
            .remove("BB2")
            .unwrap()
            .send(Ok(record("BB2")))
            .unwrap();
        let _ = senders.remove("AA1").unwrap().send(Ok(record("AA1")));

        let mut seen = Vec::new();
        let state = view.run_to_completion(|s| seen.push(s.clone())).await;

        assert_eq!(state, &ViewState::Success(Box::new(record("BB2"))));
        assert!(!seen.contains(&ViewState::Success(Box::new(record("AA1")))));
        assert_eq!(view.request().flight_number, "BB2");
    }

    #[tokio::test]
    async fn test_stale_update_is_discarded() {
        let (client, _senders) = ScriptedClient::new(&["AA1", "BB2"]);
        let mut view = DetailsView::open_with_today(
            client,
            fast(),
            request("AA1", Provider::AeroDataBox, 1),
            Some(today()),
        );
        let first = view.generation;
        view.navigate(request("BB2", Provider::AeroDataBox, 1));

        let applied = view.apply(Update {
            generation: first,
            event: Event::Settled(Ok(record("AA1"))),
        });
        assert!(!applied);
        assert_eq!(view.state(), &ViewState::Loading { progress: 0 });

        let applied = view.apply(Update {
            generation: view.generation,
            event: Event::Settled(Ok(record("BB2"))),
        });
        assert!(applied);
        assert_eq!(view.state(), &ViewState::Success(Box::new(record("BB2"))));
    }

    #[tokio::test]
    async fn test_settled_state_is_final() {
        let (client, _senders) = ScriptedClient::new(&["AA1"]);
        let mut view = DetailsView::open_with_today(
            client,
            fast(),
            request("AA1", Provider::AeroDataBox, 1),
            Some(today()),
        );
        let generation = view.generation;
        assert!(view.apply(Update {
            generation,
            event: Event::Settled(Err(LookupError::NotFinalized)),
        }));
        assert!(!view.apply(Update {
            generation,
            event: Event::Progress(50),
        }));
        assert!(view.state().is_settled());
    }

    #[tokio::test]
    async fn test_navigate_to_same_request_is_noop() {
        let (client, _senders) = ScriptedClient::new(&["AA1"]);
        let mut view = DetailsView::open_with_today(
            client,
            fast(),
            request("AA1", Provider::AeroDataBox, 1),
            Some(today()),
        );
        let generation = view.generation;
        assert!(!view.navigate(request("AA1", Provider::AeroDataBox, 1)));
        assert_eq!(view.generation, generation);
        assert!(view.navigate(request("AA1", Provider::FlightAware, 1)));
        assert!(view.generation > generation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_everything() {
        let (client, mut senders) = ScriptedClient::new(&["AA1"]);
        let mut view = DetailsView::open_with_today(
            client,
            fast(),
            request("AA1", Provider::AeroDataBox, 1),
            Some(today()),
        );
        view.cancel();
        let _ = senders.remove("AA1").unwrap().send(Ok(record("AA1")));

        tokio::time::sleep(Duration::from_secs(5)).await;
        while let Ok(update) = view.rx.try_recv() {
            assert!(!view.apply(update));
        }
        assert_eq!(view.state(), &ViewState::Loading { progress: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_update_returns_none_after_cancel() {
        let (client, _senders) = ScriptedClient::new(&["AA1"]);
        let mut view = DetailsView::open_with_today(
            client,
            fast(),
            request("AA1", Provider::AeroDataBox, 1),
            Some(today()),
        );
        view.cancel();
        assert!(view.is_cancelled());

        let update = tokio::time::timeout(Duration::from_secs(3600), view.next_update())
            .await
            .expect("next_update should return after cancel");
        assert!(update.is_none());

        let state = tokio::time::timeout(Duration::from_secs(3600), view.run_to_completion(|_| {}))
            .await
            .expect("run_to_completion should return after cancel");
        assert_eq!(state, &ViewState::Loading { progress: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_after_cancel_resumes() {
        let (client, mut senders) = ScriptedClient::new(&["AA1", "BB2"]);
        let mut view = DetailsView::open_with_today(
            client,
            fast(),
            request("AA1", Provider::AeroDataBox, 1),
            Some(today()),
        );
        view.cancel();
        assert!(view.navigate(request("BB2", Provider::AeroDataBox, 1)));
        assert!(!view.is_cancelled());

        senders
            .remove("BB2")
            .unwrap()
            .send(Ok(record("BB2")))
            .unwrap();
        let state = view.run_to_completion(|_| {}).await;
        assert_eq!(state, &ViewState::Success(Box::new(record("BB2"))));
        assert!(!view.is_cancelled());
    }

    #[test]
    fn test_default_progress_settings() {
        let settings = ProgressSettings::default();
        assert_eq!(settings.step, 10);
        assert_eq!(settings.ceiling, 90);
        assert_eq!(settings.tick, Duration::from_millis(400));
        assert_eq!(settings.settle, Duration::from_millis(400));
    }
}
