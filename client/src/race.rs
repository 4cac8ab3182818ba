//! Race screen view-model
//!
//! Turns presence events into karts on lanes, drives the local player's
//! question countdown, and collects the notifications and podium the renderer
//! shows. Everything here is plain state; drawing lives in the binary.

use crate::countdown::{CountdownController, CountdownTransition};
use crate::presence::{PresenceEvent, RenderHandle};
use crate::scene::SceneChange;
use crate::session::{Dispatch, SessionEvent, SessionManager};
use log::{debug, info};
use shared::{GamePhase, PlayerRecord, ServerMessage, Standing};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

const DEFAULT_CAR: &str = "assets/png/char/mc_car.png";
const NOTIFICATION_LIFETIME: Duration = Duration::from_secs(3);
const PODIUM_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Kart {
    pub handle: RenderHandle,
    pub lane: usize,
    pub name: String,
    pub car: String,
    /// Share of the track covered, `0.0..=1.0`
    pub progress: f32,
    pub is_local: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Failure,
    Highlight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub text: String,
    pub tone: Tone,
    pub posted_at: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameOver {
    pub winner: String,
    pub podium: Vec<Standing>,
}

pub struct RaceScene {
    karts: BTreeMap<String, Kart>,
    countdown: CountdownController,
    score: u32,
    connected: bool,
    notifications: Vec<Notification>,
    boosts: Vec<RenderHandle>,
    game_over: Option<GameOver>,
    pub answer_input: String,
}

impl RaceScene {
    pub fn new(session: &SessionManager) -> Self {
        let mut scene = Self {
            karts: BTreeMap::new(),
            countdown: CountdownController::new(),
            score: 0,
            connected: session.is_connected(),
            notifications: Vec::new(),
            boosts: Vec::new(),
            game_over: None,
            answer_input: String::new(),
        };

        // Players already known from the lobby get their karts up front.
        let now = Instant::now();
        let local_id = session.my_player_id().map(str::to_string);
        let mut known: Vec<_> = session
            .presence()
            .ids()
            .filter_map(|id| session.presence().get(id).map(|entry| (id, entry)))
            .collect();
        // Handles are allocated in join order.
        known.sort_by_key(|(_, entry)| entry.handle);
        for (id, entry) in known {
            scene.add_kart(id, entry.handle, &entry.record, local_id.as_deref(), now);
        }
        scene
    }

    pub fn handle_event(
        &mut self,
        session: &SessionManager,
        event: &SessionEvent,
        now: Instant,
    ) -> SceneChange {
        self.connected = session.is_connected();
        let local_id = session.my_player_id();

        match event {
            SessionEvent::State { changes, .. } => {
                for change in changes {
                    self.apply_change(change, local_id, now);
                }
            }
            SessionEvent::Message(message) => self.apply_message(message, local_id, now),
            SessionEvent::Disconnected(code) => {
                info!("Race connection lost (code {})", code);
                self.karts.clear();
                self.boosts.clear();
                self.countdown.reset();
                self.answer_input.clear();
            }
        }
        SceneChange::Stay
    }

    fn apply_change(&mut self, change: &PresenceEvent, local_id: Option<&str>, now: Instant) {
        match change {
            PresenceEvent::PlayerJoined { id, handle, record } => {
                self.add_kart(id, *handle, record, local_id, now);
            }
            PresenceEvent::PlayerUpdated { id, record, .. } => {
                if let Some(kart) = self.karts.get_mut(id) {
                    kart.progress = record.track_progress();
                }
                if Some(id.as_str()) == local_id {
                    self.track_local(record, now);
                }
            }
            PresenceEvent::PlayerLeft { id, .. } => {
                if self.karts.remove(id).is_some() {
                    info!("Player left during race: {}", id);
                }
            }
        }
    }

    fn add_kart(
        &mut self,
        id: &str,
        handle: RenderHandle,
        record: &PlayerRecord,
        local_id: Option<&str>,
        now: Instant,
    ) {
        let lane = self.free_lane();
        let is_local = Some(id) == local_id;
        debug!("Creating kart for {} in lane {}", id, lane);

        self.karts.insert(
            id.to_string(),
            Kart {
                handle,
                lane,
                name: if record.name.is_empty() {
                    "Player".to_string()
                } else {
                    record.name.clone()
                },
                car: record
                    .character
                    .as_ref()
                    .map(|c| c.car.clone())
                    .unwrap_or_else(|| DEFAULT_CAR.to_string()),
                progress: record.track_progress(),
                is_local,
            },
        );

        if is_local {
            self.track_local(record, now);
        }
    }

    fn free_lane(&self) -> usize {
        (0..)
            .find(|lane| self.karts.values().all(|kart| kart.lane != *lane))
            .unwrap_or(self.karts.len())
    }

    fn track_local(&mut self, record: &PlayerRecord, now: Instant) {
        self.score = record.score;
        if let CountdownTransition::Started { question, duration } =
            self.countdown.observe(record, now)
        {
            debug!("New question '{}' with {:?} to answer", question, duration);
        }
    }

    fn apply_message(&mut self, message: &ServerMessage, local_id: Option<&str>, now: Instant) {
        match message {
            ServerMessage::GameStarted => self.notify(
                "Race Started! Answer questions to speed up!",
                Tone::Info,
                now,
            ),
            ServerMessage::PlayerAnswered { player_id, correct } => {
                let mine = Some(player_id.as_str()) == local_id;
                if *correct {
                    if let Some(kart) = self.karts.get(player_id) {
                        self.boosts.push(kart.handle);
                    }
                    if mine {
                        self.notify("Correct! Speed boost!", Tone::Success, now);
                    }
                } else if mine {
                    self.notify("Wrong answer, try again!", Tone::Failure, now);
                }
            }
            ServerMessage::GameFinished { winner, standings } => {
                info!("Race finished, winner: {}", winner);
                self.countdown.reset();
                self.game_over = Some(GameOver {
                    winner: winner.clone(),
                    podium: standings.iter().take(PODIUM_SIZE).cloned().collect(),
                });
            }
            ServerMessage::CanStart { players_needed } => {
                if *players_needed == 0 {
                    self.notify(
                        "Ready to start! Press ENTER to begin race.",
                        Tone::Highlight,
                        now,
                    );
                }
            }
            ServerMessage::PlayerReady { .. } => {}
        }
    }

    fn notify(&mut self, text: &str, tone: Tone, now: Instant) {
        self.notifications.push(Notification {
            text: text.to_string(),
            tone,
            posted_at: now,
        });
    }

    /// Sends the typed answer. Input that is not an integer is kept and not sent.
    pub fn submit_answer(&mut self, session: &mut SessionManager) -> Dispatch {
        let Ok(answer) = self.answer_input.trim().parse::<i64>() else {
            return Dispatch::Dropped;
        };
        debug!("Submitting answer: {}", answer);
        let dispatch = session.send_answer(answer);
        self.answer_input.clear();
        dispatch
    }

    /// Enter starts the race while waiting (once everyone is ready) and
    /// submits the answer while racing.
    pub fn confirm(&mut self, session: &mut SessionManager) -> Dispatch {
        match session.phase() {
            GamePhase::Waiting if session.can_start_game() => session.request_start(),
            GamePhase::Racing => self.submit_answer(session),
            _ => Dispatch::Dropped,
        }
    }

    /// Leaves the results screen for a new round of character selection.
    pub async fn exit_results(&mut self, session: &mut SessionManager) -> SceneChange {
        session.leave().await;
        self.shutdown();
        SceneChange::ToCharacterSelect
    }

    pub fn shutdown(&mut self) {
        self.karts.clear();
        self.countdown.reset();
        self.notifications.clear();
        self.boosts.clear();
        self.game_over = None;
        self.answer_input.clear();
    }

    /// Drops notifications older than their display lifetime.
    pub fn expire_notifications(&mut self, now: Instant) {
        self.notifications
            .retain(|n| now.saturating_duration_since(n.posted_at) < NOTIFICATION_LIFETIME);
    }

    /// Boost effects queued since the last call.
    pub fn take_boosts(&mut self) -> Vec<RenderHandle> {
        std::mem::take(&mut self.boosts)
    }

    pub fn poll_time_up(&mut self, now: Instant) -> bool {
        self.countdown.poll_expired(now)
    }

    pub fn karts(&self) -> impl Iterator<Item = &Kart> {
        self.karts.values()
    }

    pub fn kart(&self, id: &str) -> Option<&Kart> {
        self.karts.get(id)
    }

    pub fn question(&self) -> Option<&str> {
        self.countdown.question()
    }

    pub fn timer_fraction(&self, now: Instant) -> Option<f32> {
        self.countdown.fraction(now)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn game_over(&self) -> Option<&GameOver> {
        self.game_over.as_ref()
    }
}
