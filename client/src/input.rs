//! Keyboard input turned into screen actions, with press-edge detection

use macroquad::prelude::*;

pub const MAX_NAME_LEN: usize = 16;
pub const MAX_ANSWER_LEN: usize = 9;

/// One user action for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Previous,
    Next,
    Confirm,
    ToggleReady,
    Start,
    Back,
    Backspace,
    Type(char),
}

/// Samples the keyboard once per frame and reports newly pressed keys.
pub struct InputManager {
    // Previous frame key states for edge detection
    prev_left: bool,
    prev_right: bool,
    prev_enter: bool,
    prev_ready: bool,
    prev_start: bool,
    prev_escape: bool,
    prev_backspace: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            prev_left: false,
            prev_right: false,
            prev_enter: false,
            prev_ready: false,
            prev_start: false,
            prev_escape: false,
            prev_backspace: false,
        }
    }

    /// Actions triggered this frame, in a stable order.
    pub fn update(&mut self) -> Vec<UiAction> {
        let mut actions = Vec::new();

        if pressed(is_key_down(KeyCode::Left), &mut self.prev_left) {
            actions.push(UiAction::Previous);
        }
        if pressed(is_key_down(KeyCode::Right), &mut self.prev_right) {
            actions.push(UiAction::Next);
        }
        let enter = is_key_down(KeyCode::Enter) || is_key_down(KeyCode::KpEnter);
        if pressed(enter, &mut self.prev_enter) {
            actions.push(UiAction::Confirm);
        }
        if pressed(is_key_down(KeyCode::R), &mut self.prev_ready) {
            actions.push(UiAction::ToggleReady);
        }
        if pressed(is_key_down(KeyCode::S), &mut self.prev_start) {
            actions.push(UiAction::Start);
        }
        if pressed(is_key_down(KeyCode::Escape), &mut self.prev_escape) {
            actions.push(UiAction::Back);
        }
        if pressed(is_key_down(KeyCode::Backspace), &mut self.prev_backspace) {
            actions.push(UiAction::Backspace);
        }

        while let Some(c) = get_char_pressed() {
            if !c.is_control() {
                actions.push(UiAction::Type(c));
            }
        }

        actions
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

/// True on the frame a key goes down (current && !previous).
fn pressed(current: bool, previous: &mut bool) -> bool {
    let edge = current && !*previous;
    *previous = current;
    edge
}

/// Applies a typing action to the player name field.
pub fn edit_name(field: &mut String, action: UiAction) {
    edit_field(field, action, MAX_NAME_LEN, |c, _| {
        c.is_alphanumeric() || c == ' ' || c == '_'
    });
}

/// Applies a typing action to the answer field: digits, plus a leading minus.
pub fn edit_answer(field: &mut String, action: UiAction) {
    edit_field(field, action, MAX_ANSWER_LEN, |c, current| {
        c.is_ascii_digit() || (c == '-' && current.is_empty())
    });
}

fn edit_field(
    field: &mut String,
    action: UiAction,
    max_len: usize,
    accept: impl Fn(char, &str) -> bool,
) {
    match action {
        UiAction::Backspace => {
            field.pop();
        }
        UiAction::Type(c) if field.chars().count() < max_len && accept(c, field.as_str()) => {
            field.push(c);
        }
        _ => {}
    }
}
