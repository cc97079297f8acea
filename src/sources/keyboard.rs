//! Keyboard event source.
//!
//! [`Keyboard`] is fed by the host (a platform layer, a replay file, a test)
//! and turns each call into a keyboard event. It keeps the set of held keys so
//! the current state can be read back without touching the queue.

use crate::error::{Error, Result};
use crate::event::{EventType, KeyboardEvent, Payload};
use crate::keycodes::KEY_MAX;
use crate::source::{lock, EventSource, EventSourceHandle};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

const KEY_WORDS: usize = (KEY_MAX as usize).div_ceil(32);

/// Snapshot of held keys and the last reported modifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardState {
    down: [u32; KEY_WORDS],
    pub modifiers: u32,
}

impl KeyboardState {
    /// `true` if `keycode` is held. Out-of-range codes are never down.
    pub fn is_down(&self, keycode: u32) -> bool {
        keycode < KEY_MAX && self.down[(keycode / 32) as usize] & (1 << (keycode % 32)) != 0
    }

    /// Held key codes in ascending order.
    pub fn pressed(&self) -> impl Iterator<Item = u32> + '_ {
        (1..KEY_MAX).filter(|&k| self.is_down(k))
    }

    fn set(&mut self, keycode: u32, down: bool) {
        let bit = 1 << (keycode % 32);
        let word = &mut self.down[(keycode / 32) as usize];
        if down {
            *word |= bit;
        } else {
            *word &= !bit;
        }
    }
}

#[derive(Debug)]
pub struct Keyboard {
    handle: EventSourceHandle,
    state: Mutex<KeyboardState>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            handle: EventSourceHandle::new("keyboard"),
            state: Mutex::new(KeyboardState::default()),
        }
    }

    pub fn key_down(&self, keycode: u32, modifiers: u32) -> Result<()> {
        self.key_edge(EventType::KEY_DOWN, keycode, modifiers, true)
    }

    pub fn key_up(&self, keycode: u32, modifiers: u32) -> Result<()> {
        self.key_edge(EventType::KEY_UP, keycode, modifiers, false)
    }

    /// Character input. `repeat` marks auto-repeated characters.
    pub fn key_char(&self, keycode: u32, unichar: char, modifiers: u32, repeat: bool) -> Result<()> {
        check_keycode(keycode)?;
        lock(&self.state).modifiers = modifiers;
        self.post(
            EventType::KEY_CHAR,
            KeyboardEvent {
                keycode,
                unichar: Some(unichar),
                modifiers,
                repeat,
            },
        );
        Ok(())
    }

    pub fn state(&self) -> KeyboardState {
        lock(&self.state).clone()
    }

    fn key_edge(&self, kind: EventType, keycode: u32, modifiers: u32, down: bool) -> Result<()> {
        check_keycode(keycode)?;
        {
            let mut state = lock(&self.state);
            state.set(keycode, down);
            state.modifiers = modifiers;
        }
        self.post(
            kind,
            KeyboardEvent {
                keycode,
                unichar: None,
                modifiers,
                repeat: false,
            },
        );
        Ok(())
    }

    fn post(&self, kind: EventType, event: KeyboardEvent) {
        log::trace!("[keyboard] {kind:?} keycode={}", event.keycode);
        self.handle.emit(kind, Payload::Keyboard(event));
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for Keyboard {
    fn event_source(&self) -> &EventSourceHandle {
        &self.handle
    }
}

fn check_keycode(keycode: u32) -> Result<()> {
    if keycode == 0 || keycode >= KEY_MAX {
        return Err(Error::OutOfRange {
            what: "keycode",
            index: keycode as usize,
            len: KEY_MAX as usize,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keycodes::*;
    use crate::queue::EventQueue;

    #[test]
    fn down_and_up_track_state() {
        let kb = Keyboard::new();
        kb.key_down(KEY_A, MOD_SHIFT).unwrap();
        kb.key_down(KEY_SPACE, 0).unwrap();
        assert!(kb.state().is_down(KEY_A));
        assert_eq!(kb.state().pressed().collect::<Vec<_>>(), vec![KEY_A, KEY_SPACE]);
        kb.key_up(KEY_A, 0).unwrap();
        assert!(!kb.state().is_down(KEY_A));
        assert!(kb.state().is_down(KEY_SPACE));
    }

    #[test]
    fn events_reach_the_queue() {
        let kb = Keyboard::new();
        let mut q = EventQueue::new();
        q.register_source(&kb);
        kb.key_down(KEY_ESCAPE, 0).unwrap();
        kb.key_char(KEY_ESCAPE, '\u{1b}', 0, false).unwrap();

        let down = q.get_next_event().unwrap();
        assert_eq!(down.kind(), EventType::KEY_DOWN);
        assert_eq!(down.keyboard().unwrap().keycode, KEY_ESCAPE);
        let ch = q.get_next_event().unwrap();
        assert_eq!(ch.kind(), EventType::KEY_CHAR);
        assert_eq!(ch.keyboard().unwrap().unichar, Some('\u{1b}'));
    }

    #[test]
    fn state_round_trips_through_json() {
        let kb = Keyboard::new();
        kb.key_down(KEY_LSHIFT, MOD_SHIFT).unwrap();
        kb.key_down(KEY_F12, MOD_SHIFT).unwrap();

        let json = serde_json::to_string(&kb.state()).unwrap();
        let back: KeyboardState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kb.state());
        assert_eq!(back.pressed().collect::<Vec<_>>(), vec![KEY_F12, KEY_LSHIFT]);
        assert_eq!(back.modifiers, MOD_SHIFT);
    }

    #[test]
    fn out_of_range_keycodes_are_rejected() {
        let kb = Keyboard::new();
        assert!(matches!(
            kb.key_down(0, 0),
            Err(Error::OutOfRange { what: "keycode", .. })
        ));
        assert!(kb.key_up(KEY_MAX, 0).is_err());
        assert!(!kb.state().is_down(KEY_MAX + 5));
    }
}
