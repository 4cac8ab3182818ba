use client::lobby::{LobbyScene, PlayerCard};
use client::race::{Kart, Notification, RaceScene, Tone};
use client::scene::CharacterSelect;
use macroquad::prelude::*;
use shared::Standing;
use std::time::Instant;

const BACKGROUND: Color = Color::new(0.1, 0.1, 0.12, 1.0);
const PANEL: Color = Color::new(0.2, 0.2, 0.24, 1.0);
const TRACK: Color = Color::new(0.27, 0.27, 0.27, 1.0);
const LANE_HEIGHT: f32 = 70.0;
const KART_WIDTH: f32 = 48.0;
const KART_HEIGHT: f32 = 28.0;

pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn draw_character_select(&self, select: &CharacterSelect) {
        clear_background(BACKGROUND);
        self.draw_centered("Choose your racer", 60.0, 36.0, WHITE);

        let character = select.current();
        let card_w = 260.0;
        let card_x = (self.width - card_w) / 2.0;
        draw_rectangle(card_x, 100.0, card_w, 220.0, PANEL);
        draw_rectangle_lines(card_x, 100.0, card_w, 220.0, 2.0, WHITE);
        draw_text("<", card_x - 40.0, 220.0, 48.0, GRAY);
        draw_text(">", card_x + card_w + 20.0, 220.0, 48.0, GRAY);

        self.draw_centered(&character.name, 150.0, 32.0, YELLOW);
        self.draw_centered(&character.desc, 190.0, 18.0, WHITE);
        self.draw_centered(&format!("Trait: {}", character.trait_name), 230.0, 18.0, SKYBLUE);

        let name = if select.name.is_empty() {
            "(type a name)"
        } else {
            select.name.as_str()
        };
        self.draw_centered(&format!("Name: {}", name), 380.0, 24.0, WHITE);
        self.draw_centered(
            "Left/Right to browse, ENTER to join",
            self.height - 30.0,
            18.0,
            GRAY,
        );
    }

    pub fn draw_lobby(&self, lobby: &LobbyScene, ready_label: &str) {
        clear_background(BACKGROUND);
        self.draw_centered("Lobby", 50.0, 36.0, WHITE);
        self.draw_centered(lobby.status(), 90.0, 20.0, LIGHTGRAY);

        let card_w = 170.0;
        let spacing = 20.0;
        let count = lobby.cards().len() as f32;
        let total = count * card_w + (count - 1.0).max(0.0) * spacing;
        let start_x = (self.width - total) / 2.0;

        for (i, card) in lobby.cards().iter().enumerate() {
            self.draw_player_card(card, start_x + i as f32 * (card_w + spacing), 130.0, card_w);
        }

        let button_y = self.height - 110.0;
        self.draw_button(&format!("[R] {}", ready_label), self.width / 2.0 - 190.0, button_y, true);
        self.draw_button("[S] Start Race", self.width / 2.0 + 10.0, button_y, lobby.start_visible());
        self.draw_centered("ESC to leave", self.height - 30.0, 18.0, GRAY);
    }

    fn draw_player_card(&self, card: &PlayerCard, x: f32, y: f32, w: f32) {
        let h = 180.0;
        draw_rectangle(x, y, w, h, PANEL);
        let border = if card.is_local { YELLOW } else { WHITE };
        draw_rectangle_lines(x, y, w, h, 2.0, border);

        draw_rectangle(x + w / 2.0 - 30.0, y + 20.0, 60.0, 60.0, DARKGRAY);
        draw_text(&card.name, x + 12.0, y + 115.0, 22.0, WHITE);

        let status_color = if card.is_ready { GREEN } else { RED };
        draw_text(card.status_label(), x + 12.0, y + 150.0, 20.0, status_color);
    }

    fn draw_button(&self, label: &str, x: f32, y: f32, enabled: bool) {
        let (fill, text) = if enabled {
            (Color::from_rgba(40, 120, 200, 255), WHITE)
        } else {
            (Color::from_rgba(60, 60, 60, 255), GRAY)
        };
        draw_rectangle(x, y, 180.0, 44.0, fill);
        draw_text(label, x + 14.0, y + 29.0, 22.0, text);
    }

    pub fn draw_race(&self, race: &RaceScene, now: Instant) {
        clear_background(BACKGROUND);

        let track_x = 40.0;
        let track_w = self.width - 80.0;
        let track_y = 120.0;

        for kart in race.karts() {
            self.draw_lane(kart, track_x, track_y, track_w);
        }
        draw_line(
            track_x + track_w,
            track_y,
            track_x + track_w,
            track_y + 4.0 * LANE_HEIGHT,
            4.0,
            WHITE,
        );

        self.draw_question_panel(race, now);
        self.draw_hud(race);
        self.draw_notifications(race.notifications());

        if let Some(game_over) = race.game_over() {
            self.draw_podium(&game_over.winner, &game_over.podium);
        }
    }

    fn draw_lane(&self, kart: &Kart, track_x: f32, track_y: f32, track_w: f32) {
        let y = track_y + kart.lane as f32 * LANE_HEIGHT;
        draw_rectangle(track_x, y, track_w, LANE_HEIGHT - 6.0, TRACK);

        let travel = track_w - KART_WIDTH;
        let kart_x = track_x + travel * kart.progress;
        let kart_y = y + (LANE_HEIGHT - 6.0 - KART_HEIGHT) / 2.0;
        draw_rectangle(kart_x, kart_y, KART_WIDTH, KART_HEIGHT, lane_color(kart.lane));
        if kart.is_local {
            draw_rectangle_lines(kart_x, kart_y, KART_WIDTH, KART_HEIGHT, 2.0, WHITE);
        }
        draw_text(&kart.name, track_x + 6.0, y + 14.0, 16.0, WHITE);
    }

    fn draw_question_panel(&self, race: &RaceScene, now: Instant) {
        let Some(question) = race.question() else {
            return;
        };

        let panel_w = 360.0;
        let panel_x = (self.width - panel_w) / 2.0;
        let panel_y = self.height - 150.0;
        draw_rectangle(panel_x, panel_y, panel_w, 120.0, PANEL);
        draw_text(&format!("{} = ?", question), panel_x + 20.0, panel_y + 40.0, 32.0, WHITE);
        draw_text(
            &format!("> {}", race.answer_input),
            panel_x + 20.0,
            panel_y + 80.0,
            28.0,
            YELLOW,
        );

        if let Some(fraction) = race.timer_fraction(now) {
            let bar_color = if fraction > 0.5 {
                GREEN
            } else if fraction > 0.2 {
                YELLOW
            } else {
                RED
            };
            draw_rectangle(panel_x, panel_y + 108.0, panel_w * fraction, 12.0, bar_color);
        }
    }

    fn draw_hud(&self, race: &RaceScene) {
        draw_text(&format!("Score: {}", race.score()), 20.0, 40.0, 28.0, WHITE);

        let connection_color = if race.connected() { GREEN } else { RED };
        draw_rectangle(self.width - 110.0, 24.0, 10.0, 10.0, connection_color);
        let label = if race.connected() { "Online" } else { "Offline" };
        draw_text(label, self.width - 94.0, 34.0, 18.0, WHITE);
    }

    fn draw_notifications(&self, notifications: &[Notification]) {
        for (i, notification) in notifications.iter().rev().take(3).enumerate() {
            let color = match notification.tone {
                Tone::Info => WHITE,
                Tone::Success => GREEN,
                Tone::Failure => RED,
                Tone::Highlight => YELLOW,
            };
            self.draw_centered(&notification.text, 80.0 + i as f32 * 24.0, 20.0, color);
        }
    }

    fn draw_podium(&self, winner: &str, podium: &[Standing]) {
        draw_rectangle(0.0, 0.0, self.width, self.height, Color::new(0.0, 0.0, 0.0, 0.7));
        self.draw_centered(&format!("{} wins!", winner), 120.0, 40.0, GOLD);

        let heights = [160.0, 120.0, 90.0];
        let slots = [self.width / 2.0 - 60.0, self.width / 2.0 - 200.0, self.width / 2.0 + 80.0];
        let base = self.height - 120.0;

        for (place, standing) in podium.iter().enumerate() {
            let x = slots[place];
            let h = heights[place];
            draw_rectangle(x, base - h, 120.0, h, lane_color(place));
            draw_text(&format!("{}", place + 1), x + 50.0, base - h + 36.0, 32.0, BLACK);
            draw_text(&standing.name, x, base - h - 30.0, 20.0, WHITE);
            draw_text(&format!("{} pts", standing.score), x, base - h - 10.0, 18.0, LIGHTGRAY);
        }

        self.draw_centered("ENTER to play again", self.height - 40.0, 20.0, GRAY);
    }

    fn draw_centered(&self, text: &str, y: f32, size: f32, color: Color) {
        let dims = measure_text(text, None, size as u16, 1.0);
        draw_text(text, (self.width - dims.width) / 2.0, y, size, color);
    }
}

fn lane_color(lane: usize) -> Color {
    match lane % 4 {
        0 => Color::from_rgba(255, 68, 68, 255),
        1 => Color::from_rgba(0, 170, 255, 255),
        2 => Color::from_rgba(255, 200, 0, 255),
        _ => Color::from_rgba(120, 220, 90, 255),
    }
}
