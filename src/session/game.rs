use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use tokio::time::{self, Duration, Instant};
use uuid::Uuid;

use crate::{
    config::BoardAnnouncement,
    error::DuelError,
    game::{Scorer, MIN_WORD_LENGTH},
    models::Grid,
    session::{
        summary::{Outcome, PlayerResult, SessionSummary},
        Participant, ScoreCard, SessionContext,
    },
    transport::messages::{ClientMessage, ServerMessage, StopSummary},
};

/// Spacing of countdown and clock ticks
pub const TICK: Duration = Duration::from_secs(1);

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Paired, waiting for both participants to acknowledge
    AwaitingReady,
    /// Counting down to the first board
    Countdown,
    /// Words are scored; the clock is stopped during a resume countdown
    Running,
    /// The clock is stopped until both participants resume
    Paused,
    /// Terminal
    Completed,
}

/// A send that failed, and which seat it was for
struct Fault {
    seat: usize,
    error: DuelError,
}

type Step = Result<(), Fault>;

struct SessionState {
    phase: Phase,
    cards: [ScoreCard; 2],
    ready: [bool; 2],
    resume: [bool; 2],
    seconds_left: u32,
    /// Countdown ticks still to emit in the current countdown
    countdown_left: u32,
    /// Countdown ticks emitted over the whole session
    countdown_ticks: u64,
    /// A resume countdown is in progress; the clock and scoring wait for it
    resuming: bool,
    /// When the clock task should next act; `None` while nothing is scheduled
    next_deadline: Option<Instant>,
    /// Time that was left until the next clock tick when the game was paused
    paused_remainder: Duration,
}

/// One match between two participants.
///
/// All mutable state sits behind a single async mutex. Outbound messages are
/// sent while it is held, so both participants see score and phase changes
/// in the order they happened. A clock task per session drives the
/// countdown and the game clock; it is woken whenever the schedule changes.
pub struct GameSession {
    id: Uuid,
    context: Arc<SessionContext>,
    seats: [Arc<Participant>; 2],
    grid: Grid,
    state: Mutex<SessionState>,
    wake: Notify,
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("grid", &self.grid.to_string())
            .field("first", &self.seats[0].name())
            .field("second", &self.seats[1].name())
            .finish()
    }
}

impl SessionState {
    /// Running with the clock ticking
    fn is_live(&self) -> bool {
        self.phase == Phase::Running && !self.resuming
    }
}

impl GameSession {
    /// Build a session for two paired participants and register it.
    /// Nothing is sent until `open`.
    pub fn new(
        context: Arc<SessionContext>,
        seats: [Arc<Participant>; 2],
        grid: Grid,
    ) -> Arc<Self> {
        let seconds_left = context.config.duration_secs;
        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            context,
            seats,
            grid,
            state: Mutex::new(SessionState {
                phase: Phase::AwaitingReady,
                cards: Default::default(),
                ready: [false; 2],
                resume: [false; 2],
                seconds_left,
                countdown_left: 0,
                countdown_ticks: 0,
                resuming: false,
                next_deadline: None,
                paused_remainder: TICK,
            }),
            wake: Notify::new(),
        });

        for participant in &session.seats {
            participant.attach(&session);
        }
        session
            .context
            .sessions
            .insert(session.id, Arc::clone(&session));

        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn participant(&self, seat: usize) -> &Arc<Participant> {
        &self.seats[seat]
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    pub async fn seconds_left(&self) -> u32 {
        self.state.lock().await.seconds_left
    }

    pub async fn countdown_ticks(&self) -> u64 {
        self.state.lock().await.countdown_ticks
    }

    /// Snapshot of one seat's tally
    pub async fn score_card(&self, seat: usize) -> ScoreCard {
        self.state.lock().await.cards[seat].clone()
    }

    fn seat_of(&self, participant: &Participant) -> Option<usize> {
        self.seats.iter().position(|p| p.id() == participant.id())
    }

    /// Introduce the participants to each other and start the clock task
    pub async fn open(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        // A participant may have hung up between pairing and opening.
        if state.phase == Phase::Completed {
            return;
        }
        for seat in 0..2 {
            let opponent = self.seats[1 - seat].name().to_string();
            if let Err(fault) = self.send_to(seat, ServerMessage::Ready { opponent }).await {
                self.terminate(&mut state, fault).await;
                return;
            }
        }
        drop(state);

        tokio::spawn(Arc::clone(self).run_clock());
    }

    /// Apply one inbound message from `from`
    pub async fn handle(&self, from: &Participant, message: ClientMessage) {
        let Some(seat) = self.seat_of(from) else {
            tracing::warn!("{} is not seated in session {}", from.name(), self.id);
            return;
        };

        let mut state = self.state.lock().await;
        if state.phase == Phase::Completed {
            return;
        }

        let result = match message {
            ClientMessage::Play { .. } | ClientMessage::NewPlayer { .. } | ClientMessage::Ready => {
                self.acknowledge_ready(&mut state, seat);
                Ok(())
            }
            ClientMessage::Word { word } => self.submit_word(&mut state, seat, &word).await,
            ClientMessage::Chat { text } => {
                self.send_to(1 - seat, ServerMessage::Chat { text }).await
            }
            ClientMessage::Pause => self.pause(&mut state, seat).await,
            ClientMessage::Resume => self.request_resume(&mut state, seat).await,
            ClientMessage::Cancel { retract } => {
                self.cancel(&mut state, seat, retract);
                Ok(())
            }
        };

        if let Err(fault) = result {
            self.terminate(&mut state, fault).await;
        }
    }

    /// `participant`'s connection is gone; end the session if it is still live
    pub async fn disconnect(&self, participant: &Participant) {
        let Some(seat) = self.seat_of(participant) else {
            return;
        };
        let mut state = self.state.lock().await;
        if state.phase == Phase::Completed {
            return;
        }

        tracing::info!(
            "{} left session {} during {:?}",
            participant.name(),
            self.id,
            state.phase
        );
        let fault = Fault {
            seat,
            error: DuelError::Transport {
                participant: participant.name().to_string(),
                reason: "disconnected".to_string(),
            },
        };
        self.terminate(&mut state, fault).await;
    }

    fn acknowledge_ready(&self, state: &mut SessionState, seat: usize) {
        if state.phase != Phase::AwaitingReady {
            return;
        }
        state.ready[seat] = true;
        tracing::debug!("{} is ready in session {}", self.seats[seat].name(), self.id);

        if state.ready.iter().all(|&r| r) {
            self.start_countdown(state, false);
        }
    }

    fn cancel(&self, state: &mut SessionState, seat: usize, retract: bool) {
        if !retract {
            return;
        }
        match state.phase {
            Phase::AwaitingReady => state.ready[seat] = false,
            Phase::Paused => state.resume[seat] = false,
            _ => {}
        }
    }

    fn start_countdown(&self, state: &mut SessionState, resuming: bool) {
        state.phase = if resuming {
            Phase::Running
        } else {
            Phase::Countdown
        };
        state.resuming = resuming;
        state.countdown_left = if resuming {
            self.context.config.resume_countdown_ticks
        } else {
            self.context.config.countdown_ticks
        };
        state.next_deadline = Some(Instant::now());
        self.wake.notify_one();
    }

    async fn pause(&self, state: &mut SessionState, seat: usize) -> Step {
        // Only a ticking clock can be paused; a second request is moot.
        if !state.is_live() {
            return Ok(());
        }

        let now = Instant::now();
        state.paused_remainder = state
            .next_deadline
            .map_or(TICK, |deadline| deadline.saturating_duration_since(now));
        state.next_deadline = None;
        state.phase = Phase::Paused;
        state.resume = [false; 2];
        self.wake.notify_one();

        tracing::info!(
            "{} paused session {} with {}s left",
            self.seats[seat].name(),
            self.id,
            state.seconds_left
        );
        self.broadcast(ServerMessage::Pause).await
    }

    async fn request_resume(&self, state: &mut SessionState, seat: usize) -> Step {
        if state.phase != Phase::Paused {
            return Ok(());
        }
        state.resume[seat] = true;
        if !state.resume.iter().all(|&r| r) {
            return Ok(());
        }

        tracing::info!("Resuming session {}", self.id);
        self.broadcast(ServerMessage::Resume).await?;
        self.start_countdown(state, true);
        Ok(())
    }

    async fn submit_word(&self, state: &mut SessionState, seat: usize, word: &str) -> Step {
        if !state.is_live() {
            return Ok(());
        }

        let word = word.to_uppercase();
        if word.chars().count() < MIN_WORD_LENGTH || state.cards[seat].has_played(&word) {
            return Ok(());
        }

        let other = 1 - seat;
        let value = Scorer::word_value(&word);
        if state.cards[other].accepted.remove(&word) {
            state.cards[other].score -= value;
            state.cards[other].shared.insert(word.clone());
            state.cards[seat].shared.insert(word.clone());
            tracing::debug!("{} is shared in session {}", word, self.id);
        } else {
            let verdict = self.context.validator.judge(&self.grid, &word);
            let card = &mut state.cards[seat];
            if verdict.is_accepted() {
                card.score += value;
                card.accepted.insert(word.clone());
            } else {
                card.score -= Scorer::rejection_penalty();
                card.rejected.insert(word.clone());
            }
            tracing::debug!(
                "{} played {} in session {}: {:?}",
                self.seats[seat].name(),
                word,
                self.id,
                verdict
            );
        }

        self.push_scores(state).await
    }

    async fn push_scores(&self, state: &SessionState) -> Step {
        for seat in 0..2 {
            let message = ServerMessage::Score {
                mine: state.cards[seat].score,
                theirs: state.cards[1 - seat].score,
            };
            self.send_to(seat, message).await?;
        }
        Ok(())
    }

    async fn run_clock(self: Arc<Self>) {
        loop {
            let deadline = {
                let state = self.state.lock().await;
                if state.phase == Phase::Completed {
                    break;
                }
                state.next_deadline
            };

            match deadline {
                Some(at) => tokio::select! {
                    _ = time::sleep_until(at) => self.on_deadline(at).await,
                    _ = self.wake.notified() => {}
                },
                None => self.wake.notified().await,
            }
        }

        tracing::debug!("Clock stopped for session {}", self.id);
    }

    async fn on_deadline(&self, at: Instant) {
        let mut state = self.state.lock().await;
        // The schedule moved or the session ended while this tick was pending.
        if state.phase == Phase::Completed || state.next_deadline != Some(at) {
            return;
        }

        let result = match state.phase {
            Phase::Countdown => self.countdown_tick(&mut state, at).await,
            Phase::Running if state.resuming => self.countdown_tick(&mut state, at).await,
            Phase::Running => self.clock_tick(&mut state, at).await,
            _ => Ok(()),
        };

        if let Err(fault) = result {
            self.terminate(&mut state, fault).await;
        }
    }

    async fn countdown_tick(&self, state: &mut SessionState, at: Instant) -> Step {
        if state.countdown_left > 0 {
            let n = state.countdown_left;
            state.countdown_left -= 1;
            state.countdown_ticks += 1;
            state.next_deadline = Some(at + TICK);
            return self.broadcast(ServerMessage::Countdown(n)).await;
        }

        if state.resuming {
            state.resuming = false;
            state.next_deadline = Some(at + state.paused_remainder);
            return Ok(());
        }

        state.phase = Phase::Running;
        state.next_deadline = Some(at + TICK);
        tracing::info!("Session {} started on board {}", self.id, self.grid);
        for seat in 0..2 {
            let announcement = self.announcement(seat, state.seconds_left);
            self.send_to(seat, announcement).await?;
        }
        Ok(())
    }

    fn announcement(&self, seat: usize, seconds: u32) -> ServerMessage {
        let letters = self.grid.to_string();
        match self.context.config.announcement {
            BoardAnnouncement::Board => ServerMessage::Board { letters, seconds },
            BoardAnnouncement::Start => ServerMessage::Start {
                letters,
                seconds,
                opponent: self.seats[1 - seat].name().to_string(),
            },
        }
    }

    async fn clock_tick(&self, state: &mut SessionState, at: Instant) -> Step {
        state.seconds_left = state.seconds_left.saturating_sub(1);
        self.broadcast(ServerMessage::Time(state.seconds_left)).await?;

        if state.seconds_left == 0 {
            self.finish(state).await;
        } else {
            state.next_deadline = Some(at + TICK);
        }
        Ok(())
    }

    /// Normal end: word lists to both, then hang up and report
    async fn finish(&self, state: &mut SessionState) {
        state.phase = Phase::Completed;
        state.next_deadline = None;
        self.wake.notify_one();

        for seat in 0..2 {
            let stop = ServerMessage::Stop(stop_summary(&state.cards, seat));
            if let Err(error) = self.seats[seat].send(stop).await {
                tracing::warn!("Final summary not delivered in session {}: {}", self.id, error);
            }
        }
        for participant in &self.seats {
            participant.close().await;
        }
        self.context.sessions.remove(&self.id);

        tracing::info!(
            "Session {} finished: {} {} - {} {}",
            self.id,
            self.seats[0].name(),
            state.cards[0].score,
            state.cards[1].score,
            self.seats[1].name()
        );
        self.report(self.summary(state, Outcome::Finished), true);
    }

    /// Abnormal end: tell whoever is still there, then hang up both sides
    async fn terminate(&self, state: &mut SessionState, fault: Fault) {
        if state.phase == Phase::Completed {
            return;
        }
        state.phase = Phase::Completed;
        state.next_deadline = None;
        self.wake.notify_one();

        tracing::warn!("Terminating session {}: {}", self.id, fault.error);

        for seat in (0..2).filter(|&s| s != fault.seat) {
            let _ = self.seats[seat].send(ServerMessage::Terminated).await;
        }
        for participant in &self.seats {
            participant.close().await;
        }
        self.context.sessions.remove(&self.id);

        self.report(self.summary(state, Outcome::Terminated), false);
    }

    fn summary(&self, state: &SessionState, outcome: Outcome) -> SessionSummary {
        let player = |seat: usize| PlayerResult {
            name: self.seats[seat].name().to_string(),
            score: state.cards[seat].score,
            accepted: state.cards[seat].accepted.iter().cloned().collect(),
            rejected: state.cards[seat].rejected.iter().cloned().collect(),
        };

        SessionSummary {
            session_id: self.id,
            board: self.grid.clone(),
            outcome,
            players: [player(0), player(1)],
            shared: state.cards[0].shared.iter().cloned().collect(),
            possible_words: Vec::new(),
            possible_points: 0,
            finished_at: Utc::now(),
        }
    }

    /// Hand the summary to the results sink off the session lock
    fn report(&self, mut summary: SessionSummary, solve: bool) {
        let sink = Arc::clone(&self.context.sink);
        let validator = self.context.validator.clone();

        tokio::spawn(async move {
            if solve {
                let grid = summary.board.clone();
                match tokio::task::spawn_blocking(move || validator.formable_words(&grid)).await {
                    Ok(words) => {
                        summary.possible_points = Scorer::total(&words);
                        summary.possible_words = words.into_iter().collect();
                    }
                    Err(e) => tracing::error!("Board solver failed: {}", e),
                }
            }

            if let Err(e) = sink.record(summary).await {
                tracing::error!("Failed to record session summary: {}", e);
            }
        });
    }

    async fn send_to(&self, seat: usize, message: ServerMessage) -> Step {
        self.seats[seat]
            .send(message)
            .await
            .map_err(|error| Fault { seat, error })
    }

    async fn broadcast(&self, message: ServerMessage) -> Step {
        for seat in 0..2 {
            self.send_to(seat, message.clone()).await?;
        }
        Ok(())
    }
}

/// The STOP word lists as seen from `seat`
fn stop_summary(cards: &[ScoreCard; 2], seat: usize) -> StopSummary {
    let own = &cards[seat];
    let other = &cards[1 - seat];
    let list = |words: &BTreeSet<String>| -> Vec<String> { words.iter().cloned().collect() };

    StopSummary {
        own_legal: list(&own.accepted),
        opponent_legal: list(&other.accepted),
        shared: list(&own.shared),
        own_illegal: list(&own.rejected),
        opponent_illegal: list(&other.rejected),
    }
}
