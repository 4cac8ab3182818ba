//! Scene flow shared by the character select, lobby and race screens

use shared::{roster, Character};

pub const DEFAULT_PLAYER_NAME: &str = "Anonymous";

/// Where the host should go after handling an event or action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneChange {
    Stay,
    ToCharacterSelect,
    ToLobby,
    ToRace,
}

/// Character select screen: a wrap-around carousel over the roster plus a
/// name field.
#[derive(Debug)]
pub struct CharacterSelect {
    characters: Vec<Character>,
    index: usize,
    pub name: String,
}

impl CharacterSelect {
    pub fn new() -> Self {
        Self {
            characters: roster(),
            index: 0,
            name: String::new(),
        }
    }

    pub fn current(&self) -> &Character {
        &self.characters[self.index]
    }

    pub fn next(&mut self) {
        self.index = (self.index + 1) % self.characters.len();
    }

    pub fn previous(&mut self) {
        self.index = (self.index + self.characters.len() - 1) % self.characters.len();
    }

    /// Moves the carousel to the character with this name, ignoring case.
    pub fn select_named(&mut self, name: &str) -> bool {
        match self
            .characters
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
        {
            Some(index) => {
                self.index = index;
                true
            }
            None => false,
        }
    }

    /// Display name to join with; blank input falls back to [`DEFAULT_PLAYER_NAME`].
    pub fn player_name(&self) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            DEFAULT_PLAYER_NAME.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Locks in the current choice and moves on to the lobby.
    pub fn confirm(&self) -> (String, Character, SceneChange) {
        (
            self.player_name(),
            self.current().clone(),
            SceneChange::ToLobby,
        )
    }
}

impl Default for CharacterSelect {
    fn default() -> Self {
        Self::new()
    }
}
