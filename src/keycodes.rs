//! Key codes and modifier flags.
//!
//! Key codes are layout-independent and follow the native numbering, so values
//! read from a platform layer can be forwarded unchanged.

pub const KEY_A: u32 = 1;
pub const KEY_B: u32 = 2;
pub const KEY_C: u32 = 3;
pub const KEY_D: u32 = 4;
pub const KEY_E: u32 = 5;
pub const KEY_F: u32 = 6;
pub const KEY_G: u32 = 7;
pub const KEY_H: u32 = 8;
pub const KEY_I: u32 = 9;
pub const KEY_J: u32 = 10;
pub const KEY_K: u32 = 11;
pub const KEY_L: u32 = 12;
pub const KEY_M: u32 = 13;
pub const KEY_N: u32 = 14;
pub const KEY_O: u32 = 15;
pub const KEY_P: u32 = 16;
pub const KEY_Q: u32 = 17;
pub const KEY_R: u32 = 18;
pub const KEY_S: u32 = 19;
pub const KEY_T: u32 = 20;
pub const KEY_U: u32 = 21;
pub const KEY_V: u32 = 22;
pub const KEY_W: u32 = 23;
pub const KEY_X: u32 = 24;
pub const KEY_Y: u32 = 25;
pub const KEY_Z: u32 = 26;

pub const KEY_0: u32 = 27;
pub const KEY_1: u32 = 28;
pub const KEY_2: u32 = 29;
pub const KEY_3: u32 = 30;
pub const KEY_4: u32 = 31;
pub const KEY_5: u32 = 32;
pub const KEY_6: u32 = 33;
pub const KEY_7: u32 = 34;
pub const KEY_8: u32 = 35;
pub const KEY_9: u32 = 36;

pub const KEY_F1: u32 = 47;
pub const KEY_F2: u32 = 48;
pub const KEY_F3: u32 = 49;
pub const KEY_F4: u32 = 50;
pub const KEY_F5: u32 = 51;
pub const KEY_F6: u32 = 52;
pub const KEY_F7: u32 = 53;
pub const KEY_F8: u32 = 54;
pub const KEY_F9: u32 = 55;
pub const KEY_F10: u32 = 56;
pub const KEY_F11: u32 = 57;
pub const KEY_F12: u32 = 58;

pub const KEY_ESCAPE: u32 = 59;
pub const KEY_BACKSPACE: u32 = 63;
pub const KEY_TAB: u32 = 64;
pub const KEY_ENTER: u32 = 67;
pub const KEY_SPACE: u32 = 75;
pub const KEY_INSERT: u32 = 76;
pub const KEY_DELETE: u32 = 77;
pub const KEY_HOME: u32 = 78;
pub const KEY_END: u32 = 79;
pub const KEY_PGUP: u32 = 80;
pub const KEY_PGDN: u32 = 81;
pub const KEY_LEFT: u32 = 82;
pub const KEY_RIGHT: u32 = 83;
pub const KEY_UP: u32 = 84;
pub const KEY_DOWN: u32 = 85;

pub const KEY_LSHIFT: u32 = 215;
pub const KEY_RSHIFT: u32 = 216;
pub const KEY_LCTRL: u32 = 217;
pub const KEY_RCTRL: u32 = 218;
pub const KEY_ALT: u32 = 219;
pub const KEY_ALTGR: u32 = 220;

/// One past the largest valid key code.
pub const KEY_MAX: u32 = 227;

pub const MOD_SHIFT: u32 = 0x0001;
pub const MOD_CTRL: u32 = 0x0002;
pub const MOD_ALT: u32 = 0x0004;
pub const MOD_LWIN: u32 = 0x0008;
pub const MOD_RWIN: u32 = 0x0010;
pub const MOD_MENU: u32 = 0x0020;
pub const MOD_ALTGR: u32 = 0x0040;
pub const MOD_COMMAND: u32 = 0x0080;
pub const MOD_SCROLLLOCK: u32 = 0x0100;
pub const MOD_NUMLOCK: u32 = 0x0200;
pub const MOD_CAPSLOCK: u32 = 0x0400;

/// Largest supported mouse button (buttons are 1-based).
pub const MOUSE_BUTTON_MAX: u32 = 32;

/// Short display name for a key code, e.g. `"A"`, `"7"`, `"Escape"`.
pub fn key_name(keycode: u32) -> Option<String> {
    match keycode {
        KEY_A..=KEY_Z => Some(char::from(b'A' + (keycode - KEY_A) as u8).to_string()),
        KEY_0..=KEY_9 => Some(char::from(b'0' + (keycode - KEY_0) as u8).to_string()),
        KEY_F1..=KEY_F12 => Some(format!("F{}", keycode - KEY_F1 + 1)),
        KEY_ESCAPE => Some("Escape".into()),
        KEY_BACKSPACE => Some("Backspace".into()),
        KEY_TAB => Some("Tab".into()),
        KEY_ENTER => Some("Enter".into()),
        KEY_SPACE => Some("Space".into()),
        KEY_INSERT => Some("Insert".into()),
        KEY_DELETE => Some("Delete".into()),
        KEY_HOME => Some("Home".into()),
        KEY_END => Some("End".into()),
        KEY_PGUP => Some("PgUp".into()),
        KEY_PGDN => Some("PgDn".into()),
        KEY_LEFT => Some("Left".into()),
        KEY_RIGHT => Some("Right".into()),
        KEY_UP => Some("Up".into()),
        KEY_DOWN => Some("Down".into()),
        KEY_LSHIFT => Some("LShift".into()),
        KEY_RSHIFT => Some("RShift".into()),
        KEY_LCTRL => Some("LCtrl".into()),
        KEY_RCTRL => Some("RCtrl".into()),
        KEY_ALT => Some("Alt".into()),
        KEY_ALTGR => Some("AltGr".into()),
        _ => None,
    }
}
