//! Key name catalog.
//!
//! Maps case-insensitive key names to Linux input key codes. The table is
//! static and every name is stored in its canonical lowercase form.

use crate::error::{EmitKeyError, Result};
use evdev::Key;

/// One name known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCatalogEntry {
    pub name: &'static str,
    pub code: Key,
}

const fn entry(name: &'static str, code: Key) -> KeyCatalogEntry {
    KeyCatalogEntry { name, code }
}

static ENTRIES: &[KeyCatalogEntry] = &[
    // Function keys
    entry("f1", Key::KEY_F1),
    entry("f2", Key::KEY_F2),
    entry("f3", Key::KEY_F3),
    entry("f4", Key::KEY_F4),
    entry("f5", Key::KEY_F5),
    entry("f6", Key::KEY_F6),
    entry("f7", Key::KEY_F7),
    entry("f8", Key::KEY_F8),
    entry("f9", Key::KEY_F9),
    entry("f10", Key::KEY_F10),
    entry("f11", Key::KEY_F11),
    entry("f12", Key::KEY_F12),
    // Letters
    entry("a", Key::KEY_A),
    entry("b", Key::KEY_B),
    entry("c", Key::KEY_C),
    entry("d", Key::KEY_D),
    entry("e", Key::KEY_E),
    entry("f", Key::KEY_F),
    entry("g", Key::KEY_G),
    entry("h", Key::KEY_H),
    entry("i", Key::KEY_I),
    entry("j", Key::KEY_J),
    entry("k", Key::KEY_K),
    entry("l", Key::KEY_L),
    entry("m", Key::KEY_M),
    entry("n", Key::KEY_N),
    entry("o", Key::KEY_O),
    entry("p", Key::KEY_P),
    entry("q", Key::KEY_Q),
    entry("r", Key::KEY_R),
    entry("s", Key::KEY_S),
    entry("t", Key::KEY_T),
    entry("u", Key::KEY_U),
    entry("v", Key::KEY_V),
    entry("w", Key::KEY_W),
    entry("x", Key::KEY_X),
    entry("y", Key::KEY_Y),
    entry("z", Key::KEY_Z),
    // Numbers
    entry("0", Key::KEY_0),
    entry("1", Key::KEY_1),
    entry("2", Key::KEY_2),
    entry("3", Key::KEY_3),
    entry("4", Key::KEY_4),
    entry("5", Key::KEY_5),
    entry("6", Key::KEY_6),
    entry("7", Key::KEY_7),
    entry("8", Key::KEY_8),
    entry("9", Key::KEY_9),
    // Special keys
    entry("space", Key::KEY_SPACE),
    entry("enter", Key::KEY_ENTER),
    entry("return", Key::KEY_ENTER),
    entry("tab", Key::KEY_TAB),
    entry("esc", Key::KEY_ESC),
    entry("escape", Key::KEY_ESC),
    entry("backspace", Key::KEY_BACKSPACE),
    entry("delete", Key::KEY_DELETE),
    entry("insert", Key::KEY_INSERT),
    entry("home", Key::KEY_HOME),
    entry("end", Key::KEY_END),
    entry("pageup", Key::KEY_PAGEUP),
    entry("pagedown", Key::KEY_PAGEDOWN),
    // Arrow keys
    entry("up", Key::KEY_UP),
    entry("down", Key::KEY_DOWN),
    entry("left", Key::KEY_LEFT),
    entry("right", Key::KEY_RIGHT),
];

/// Resolve a key name to its key code, ignoring case.
///
/// # Example
///
/// ```
/// use emit_key::catalog;
/// use evdev::Key;
///
/// assert_eq!(catalog::lookup("F12").unwrap(), Key::KEY_F12);
/// assert!(catalog::lookup("hyper").is_err());
/// ```
pub fn lookup(name: &str) -> Result<Key> {
    let normalized = name.trim().to_lowercase();
    ENTRIES
        .iter()
        .find(|entry| entry.name == normalized)
        .map(|entry| entry.code)
        .ok_or_else(|| EmitKeyError::unknown_key(name))
}

/// All catalog entries in table order.
pub fn entries() -> &'static [KeyCatalogEntry] {
    ENTRIES
}
