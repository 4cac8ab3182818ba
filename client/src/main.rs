mod input;
mod rendering;

use clap::Parser;
use client::config::SessionConfig;
use client::lobby::LobbyScene;
use client::network::UdpConnector;
use client::race::RaceScene;
use client::scene::{CharacterSelect, SceneChange};
use client::session::{SessionEvent, SessionManager};
use input::{edit_answer, edit_name, InputManager, UiAction};
use log::{debug, error, info, warn};
use macroquad::prelude::*;
use rendering::Renderer;
use shared::Difficulty;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Room server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3001")]
    server: String,

    /// Player name to pre-fill on the character screen
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Character to pre-select by name
    #[arg(short = 'c', long)]
    character: Option<String>,

    /// Question difficulty: easy, medium or hard
    #[arg(short = 'd', long, default_value = "easy")]
    difficulty: Difficulty,

    /// Seconds to wait for the connection
    #[arg(long, default_value = "5")]
    connect_timeout: u64,

    /// Seconds to wait for the join answer
    #[arg(long, default_value = "5")]
    join_timeout: u64,

    /// Window width
    #[arg(short = 'w', long, default_value = "1024")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "640")]
    height: usize,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.server.clone())
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .with_join_timeout(Duration::from_secs(self.join_timeout))
    }
}

enum Screen {
    Select(CharacterSelect),
    Lobby(LobbyScene),
    Race(RaceScene),
}

/// Owns the session and drives one screen at a time. Network calls that
/// wait (connect, join, leave) run on the runtime; everything else is
/// polled once per frame.
struct App {
    runtime: Runtime,
    session: SessionManager,
    screen: Screen,
    input: InputManager,
    renderer: Renderer,
    difficulty: Difficulty,
    quit: bool,
}

impl App {
    fn new(args: &Args) -> Result<Self, Box<dyn std::error::Error>> {
        let mut select = CharacterSelect::new();
        if let Some(name) = &args.name {
            select.name = name.clone();
        }
        if let Some(character) = &args.character {
            if !select.select_named(character) {
                warn!("Unknown character '{}', using {}", character, select.current().name);
            }
        }

        Ok(App {
            runtime: Runtime::new()?,
            session: SessionManager::new(Box::new(UdpConnector::new()), args.session_config()),
            screen: Screen::Select(select),
            input: InputManager::new(),
            renderer: Renderer::new(args.width, args.height),
            difficulty: args.difficulty,
            quit: false,
        })
    }

    fn update(&mut self) {
        let actions = self.input.update();

        for event in self.session.poll_events() {
            self.route_event(&event);
        }
        for action in actions {
            self.handle_action(action);
        }

        if let Screen::Race(race) = &mut self.screen {
            let now = Instant::now();
            race.expire_notifications(now);
            for handle in race.take_boosts() {
                debug!("Boost effect on kart {}", handle.index());
            }
            if race.poll_time_up(now) {
                info!("Question timer ran out");
            }
        }
    }

    fn route_event(&mut self, event: &SessionEvent) {
        let change = match &mut self.screen {
            Screen::Select(_) => SceneChange::Stay,
            Screen::Lobby(lobby) => lobby.handle_event(&self.session, event),
            Screen::Race(race) => race.handle_event(&self.session, event, Instant::now()),
        };

        if change == SceneChange::ToRace {
            info!("Race starting");
            let mut race = RaceScene::new(&self.session);
            race.handle_event(&self.session, event, Instant::now());
            self.screen = Screen::Race(race);
        }
    }

    fn handle_action(&mut self, action: UiAction) {
        let session = &mut self.session;
        let change = match &mut self.screen {
            Screen::Select(select) => match action {
                UiAction::Previous => {
                    select.previous();
                    SceneChange::Stay
                }
                UiAction::Next => {
                    select.next();
                    SceneChange::Stay
                }
                UiAction::Confirm => SceneChange::ToLobby,
                UiAction::Back => {
                    self.quit = true;
                    SceneChange::Stay
                }
                other => {
                    edit_name(&mut select.name, other);
                    SceneChange::Stay
                }
            },
            Screen::Lobby(lobby) => match action {
                UiAction::ToggleReady => {
                    lobby.toggle_ready(session);
                    SceneChange::Stay
                }
                UiAction::Start | UiAction::Confirm => {
                    lobby.start(session);
                    SceneChange::Stay
                }
                UiAction::Back => self.runtime.block_on(lobby.exit(session)),
                _ => SceneChange::Stay,
            },
            Screen::Race(race) => match action {
                UiAction::Confirm if race.game_over().is_some() => {
                    self.runtime.block_on(race.exit_results(session))
                }
                UiAction::Confirm => {
                    race.confirm(session);
                    SceneChange::Stay
                }
                UiAction::Back => self.runtime.block_on(race.exit_results(session)),
                other => {
                    edit_answer(&mut race.answer_input, other);
                    SceneChange::Stay
                }
            },
        };

        self.apply_change(change);
    }

    fn apply_change(&mut self, change: SceneChange) {
        match change {
            SceneChange::Stay | SceneChange::ToRace => {}
            SceneChange::ToCharacterSelect => {
                self.screen = Screen::Select(CharacterSelect::new());
            }
            SceneChange::ToLobby => {
                let Screen::Select(select) = &self.screen else {
                    return;
                };
                let (name, character, _) = select.confirm();
                info!("Joining as {} with {}", name, character.name);

                let mut lobby = LobbyScene::new(name, Some(character)).with_difficulty(self.difficulty);
                if let Err(e) = self.runtime.block_on(lobby.enter(&mut self.session)) {
                    error!("Could not enter lobby: {}", e);
                }
                self.screen = Screen::Lobby(lobby);
            }
        }
    }

    fn draw(&self) {
        match &self.screen {
            Screen::Select(select) => self.renderer.draw_character_select(select),
            Screen::Lobby(lobby) => self
                .renderer
                .draw_lobby(lobby, lobby.ready_button_label(&self.session)),
            Screen::Race(race) => self.renderer.draw_race(race, Instant::now()),
        }
    }

    fn shutdown(&mut self) {
        self.runtime.block_on(self.session.disconnect());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Server: {} (difficulty {})", args.server, args.difficulty);
    info!("Controls: Left/Right to pick, ENTER to confirm, R ready, S start, ESC back");

    let mut app = App::new(&args)?;
    let conf = Conf {
        window_title: "Math Racer".to_string(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        ..Default::default()
    };

    macroquad::Window::from_config(conf, async move {
        while !app.quit {
            app.update();
            app.draw();
            next_frame().await;
        }
        app.shutdown();
    });

    Ok(())
}
