//! Discretizers: sub-classifying events by value.
//!
//! A [`Discretizer`] maps an event to a 64-bit value used as the last part of a
//! handler coordinate, so that, say, `KEY_DOWN` for Escape and `KEY_DOWN` for
//! Space can go to different handlers. It returns `None` for events it does not
//! understand.
//!
//! Every [`EventDispatcher`](crate::dispatcher::EventDispatcher) starts with the
//! built-ins below, registered in this order:
//!
//! | id                 | applies to                 | value         |
//! |--------------------|----------------------------|---------------|
//! | `KEYCODE`          | `KEY_DOWN/KEY_CHAR/KEY_UP` | key code      |
//! | `MOUSE_BUTTON`     | `MOUSE_BUTTON_DOWN/UP`     | button (1-based) |
//! | `JOYSTICK_BUTTON`  | `JOYSTICK_BUTTON_DOWN/UP`  | button        |

use crate::event::{Event, EventType};

/// Registration index of a discretizer within its dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiscretizerId(pub usize);

impl DiscretizerId {
    pub const KEYCODE: DiscretizerId = DiscretizerId(0);
    pub const MOUSE_BUTTON: DiscretizerId = DiscretizerId(1);
    pub const JOYSTICK_BUTTON: DiscretizerId = DiscretizerId(2);
}

pub struct Discretizer {
    id: DiscretizerId,
    name: String,
    func: Box<dyn Fn(&Event) -> Option<i64>>,
}

impl Discretizer {
    pub(crate) fn new(
        id: DiscretizerId,
        name: impl Into<String>,
        func: impl Fn(&Event) -> Option<i64> + 'static,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            func: Box::new(func),
        }
    }

    #[inline]
    pub fn id(&self) -> DiscretizerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn discretize(&self, event: &Event) -> Option<i64> {
        (self.func)(event)
    }
}

impl std::fmt::Debug for Discretizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discretizer")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

pub fn keycode(event: &Event) -> Option<i64> {
    event.keyboard().map(|k| i64::from(k.keycode))
}

pub fn mouse_button(event: &Event) -> Option<i64> {
    match event.kind() {
        EventType::MOUSE_BUTTON_DOWN | EventType::MOUSE_BUTTON_UP => {
            event.mouse().map(|m| i64::from(m.button))
        }
        _ => None,
    }
}

pub fn joystick_button(event: &Event) -> Option<i64> {
    match event.kind() {
        EventType::JOYSTICK_BUTTON_DOWN | EventType::JOYSTICK_BUTTON_UP => {
            event.joystick().map(|j| i64::from(j.button))
        }
        _ => None,
    }
}

pub(crate) fn builtin() -> Vec<Discretizer> {
    vec![
        Discretizer::new(DiscretizerId::KEYCODE, "keycode", keycode),
        Discretizer::new(DiscretizerId::MOUSE_BUTTON, "mouse-button", mouse_button),
        Discretizer::new(
            DiscretizerId::JOYSTICK_BUTTON,
            "joystick-button",
            joystick_button,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{KeyboardEvent, MouseEvent, Payload};

    #[test]
    fn builtins_are_in_id_order() {
        let all = builtin();
        for (i, d) in all.iter().enumerate() {
            assert_eq!(d.id(), DiscretizerId(i));
        }
        assert_eq!(all[0].name(), "keycode");
    }

    #[test]
    fn mouse_button_ignores_motion() {
        let motion = Event::new(EventType::MOUSE_AXES, Payload::Mouse(MouseEvent::default()));
        assert_eq!(mouse_button(&motion), None);
        let press = Event::new(
            EventType::MOUSE_BUTTON_DOWN,
            Payload::Mouse(MouseEvent {
                button: 2,
                ..MouseEvent::default()
            }),
        );
        assert_eq!(mouse_button(&press), Some(2));
    }

    #[test]
    fn keycode_reads_keyboard_payloads_only() {
        let key = Event::new(
            EventType::KEY_UP,
            Payload::Keyboard(KeyboardEvent {
                keycode: 59,
                unichar: None,
                modifiers: 0,
                repeat: false,
            }),
        );
        assert_eq!(keycode(&key), Some(59));
        assert_eq!(keycode(&Event::new(EventType::TIMER, Payload::None)), None);
    }
}
