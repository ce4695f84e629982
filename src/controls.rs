//! Keyboard controls for the scan loop

use anyhow::{anyhow, Result};
use tracing::info;

use crate::capture::MAX_FOCUS;
use crate::config::ControlSettings;

/// What a key press asks the scanner to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    FocusDown,
    FocusUp,
}

/// Parses a key string like "q", "[", "ESC" or "SPACE" into a key
pub fn parse_key(key_str: &str) -> Result<char> {
    let trimmed = key_str.trim();
    let mut chars = trimmed.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(c);
    }

    let key = match trimmed.to_uppercase().as_str() {
        "ESCAPE" | "ESC" => '\u{1b}',
        "SPACE" => ' ',
        "TAB" => '\t',
        "ENTER" | "RETURN" => '\n',
        _ => return Err(anyhow!("Unsupported key: {:?}", key_str)),
    };
    Ok(key)
}

/// Key to action mapping
#[derive(Debug, Clone)]
pub struct KeyBindings {
    quit: char,
    focus_down: char,
    focus_up: char,
}

impl KeyBindings {
    /// Build bindings from settings, rejecting keys bound twice
    pub fn from_settings(settings: &ControlSettings) -> Result<Self> {
        let bindings = Self {
            quit: parse_key(&settings.quit)?,
            focus_down: parse_key(&settings.focus_down)?,
            focus_up: parse_key(&settings.focus_up)?,
        };

        if bindings.quit == bindings.focus_down
            || bindings.quit == bindings.focus_up
            || bindings.focus_down == bindings.focus_up
        {
            return Err(anyhow!("Each control needs its own key"));
        }
        Ok(bindings)
    }

    /// Action bound to `key`, if any
    pub fn action(&self, key: char) -> Option<KeyAction> {
        match key {
            k if k == self.quit => Some(KeyAction::Quit),
            k if k == self.focus_down => Some(KeyAction::FocusDown),
            k if k == self.focus_up => Some(KeyAction::FocusUp),
            _ => None,
        }
    }
}

/// Manual focus level, clamped to 0..=255
#[derive(Debug, Clone, Copy)]
pub struct FocusControl {
    level: u8,
    step: u8,
}

impl FocusControl {
    pub fn new(level: u8, step: u8) -> Self {
        Self { level, step }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Apply a focus action, returning the new level when it changed
    pub fn apply(&mut self, action: KeyAction) -> Option<u8> {
        let next = match action {
            KeyAction::FocusDown => self.level.saturating_sub(self.step),
            KeyAction::FocusUp => self.level.saturating_add(self.step).min(MAX_FOCUS),
            KeyAction::Quit => return None,
        };

        if next == self.level {
            return None;
        }
        info!("Focus {} -> {}", self.level, next);
        self.level = next;
        Some(next)
    }
}
