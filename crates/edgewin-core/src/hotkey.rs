//! Global hotkeys: the `Ctrl+Alt+Q` string grammar and the per-window table
//! of registered combinations.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

/// Largest id an application may pass to the OS hotkey API.
pub const MAX_HOTKEY_ID: i32 = 0xBFFF;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HotKeyError {
    #[error("malformed hotkey {0:?}")]
    InvalidFormat(String),

    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),

    #[error("unknown key {0:?}")]
    UnknownKey(String),

    #[error("hotkey {0:?} needs at least one modifier")]
    MissingModifier(String),

    /// The OS refused the registration, usually because another
    /// application already owns the combination.
    #[error("registration of {hotkey} denied: {reason}")]
    Denied { hotkey: String, reason: String },

    #[error("no free hotkey ids left")]
    IdsExhausted,
}

bitflags::bitflags! {
    /// Modifier bits, using the Win32 `MOD_*` values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
    pub struct Modifiers: u32 {
        const ALT = 0x0001;
        const CONTROL = 0x0002;
        const SHIFT = 0x0004;
        const WIN = 0x0008;
    }
}

impl Modifiers {
    fn from_modifier_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ctrl" => Some(Self::CONTROL),
            "alt" => Some(Self::ALT),
            "shift" => Some(Self::SHIFT),
            "win" => Some(Self::WIN),
            _ => None,
        }
    }
}

/// Virtual-key codes for the named keys.
pub mod vk {
    pub const TAB: u32 = 0x09;
    pub const ESCAPE: u32 = 0x1B;
    pub const SPACE: u32 = 0x20;
    pub const F1: u32 = 0x70;
    pub const F12: u32 = 0x7B;
}

const NAMED_KEYS: &[(&str, u32)] = &[
    ("esc", vk::ESCAPE),
    ("tab", vk::TAB),
    ("space", vk::SPACE),
];

fn key_from_name(name: &str) -> Option<u32> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            // Letters and digits share their ASCII uppercase code.
            return Some(c.to_ascii_uppercase() as u32);
        }
        return None;
    }

    let lower = name.to_ascii_lowercase();
    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u32>().ok()) {
        if (1..=12).contains(&n) && !lower[1..].starts_with('0') {
            return Some(vk::F1 + n - 1);
        }
        return None;
    }

    NAMED_KEYS
        .iter()
        .find(|(key, _)| *key == lower)
        .map(|(_, code)| *code)
}

fn key_name(code: u32) -> String {
    match code {
        vk::F1..=vk::F12 => format!("F{}", code - vk::F1 + 1),
        vk::ESCAPE => "Esc".to_string(),
        vk::TAB => "Tab".to_string(),
        vk::SPACE => "Space".to_string(),
        c => char::from_u32(c)
            .map(String::from)
            .unwrap_or_else(|| format!("{:#x}", c)),
    }
}

/// A modifier set plus one virtual key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HotKey {
    pub modifiers: Modifiers,
    pub key: u32,
}

impl HotKey {
    pub fn new(modifiers: Modifiers, key: u32) -> Self {
        Self { modifiers, key }
    }

    /// Parse `Modifier(+Modifier)*+Key`, ignoring case and surrounding
    /// whitespace around each token.
    pub fn parse(input: &str) -> Result<Self, HotKeyError> {
        let parts: Vec<&str> = input.split('+').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(HotKeyError::InvalidFormat(input.to_string()));
        }
        let Some((key, modifiers)) = parts.split_last() else {
            return Err(HotKeyError::InvalidFormat(input.to_string()));
        };
        if modifiers.is_empty() {
            return Err(HotKeyError::MissingModifier(input.to_string()));
        }

        let modifiers = modifiers
            .iter()
            .try_fold(Modifiers::empty(), |acc, name| {
                Modifiers::from_modifier_name(name)
                    .map(|m| acc | m)
                    .ok_or_else(|| HotKeyError::UnknownModifier(name.to_string()))
            })?;
        let key = key_from_name(key).ok_or_else(|| HotKeyError::UnknownKey(key.to_string()))?;

        Ok(Self { modifiers, key })
    }
}

impl FromStr for HotKey {
    type Err = HotKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, name) in [
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::WIN, "Win"),
        ] {
            if self.modifiers.contains(bit) {
                write!(f, "{}+", name)?;
            }
        }
        f.write_str(&key_name(self.key))
    }
}

struct Entry<H> {
    hotkey: HotKey,
    handler: H,
}

/// Registered hotkeys for one window, keyed by the id given to the OS.
///
/// Ids count up from 1. Once the counter passes [`MAX_HOTKEY_ID`] the lowest
/// id not currently registered is handed out instead.
pub struct HotKeyTable<H> {
    entries: BTreeMap<i32, Entry<H>>,
    next_id: i32,
}

impl<H> HotKeyTable<H> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&self) -> Result<i32, HotKeyError> {
        if self.next_id <= MAX_HOTKEY_ID {
            return Ok(self.next_id);
        }
        (1..=MAX_HOTKEY_ID)
            .find(|id| !self.entries.contains_key(id))
            .ok_or(HotKeyError::IdsExhausted)
    }

    /// Register `hotkey` through `native` and store its handler.
    ///
    /// Nothing is stored if the native registration fails.
    pub fn register<F>(&mut self, hotkey: HotKey, handler: H, native: F) -> Result<i32, HotKeyError>
    where
        F: FnOnce(i32, HotKey) -> Result<(), HotKeyError>,
    {
        if self.find(&hotkey).is_some() {
            return Err(HotKeyError::Denied {
                hotkey: hotkey.to_string(),
                reason: "already registered by this window".to_string(),
            });
        }

        let id = self.allocate_id()?;
        native(id, hotkey)?;

        if id == self.next_id {
            self.next_id += 1;
        }
        self.entries.insert(id, Entry { hotkey, handler });
        info!("Registered hotkey {} as id {}", hotkey, id);
        Ok(id)
    }

    /// Remove an entry, releasing its native registration through `native`.
    pub fn unregister<F>(&mut self, id: i32, native: F) -> Option<HotKey>
    where
        F: FnOnce(i32),
    {
        let entry = self.entries.remove(&id)?;
        native(id);
        debug!("Unregistered hotkey {} (id {})", entry.hotkey, id);
        Some(entry.hotkey)
    }

    /// Id registered for an exact modifier/key combination.
    pub fn find(&self, hotkey: &HotKey) -> Option<i32> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.hotkey == *hotkey)
            .map(|(id, _)| *id)
    }

    pub fn handler(&self, id: i32) -> Option<&H> {
        self.entries.get(&id).map(|entry| &entry.handler)
    }

    pub fn hotkey(&self, id: i32) -> Option<HotKey> {
        self.entries.get(&id).map(|entry| entry.hotkey)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry, releasing each native registration.
    pub fn clear<F>(&mut self, mut native: F) -> usize
    where
        F: FnMut(i32),
    {
        let entries = std::mem::take(&mut self.entries);
        for id in entries.keys() {
            native(*id);
        }
        entries.len()
    }
}

impl<H> Default for HotKeyTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_: i32, _: HotKey) -> Result<(), HotKeyError> {
        Ok(())
    }

    #[test]
    fn test_parse_ctrl_alt_q() {
        let hotkey = HotKey::parse("Ctrl+Alt+Q").unwrap();
        assert_eq!(hotkey.modifiers, Modifiers::CONTROL | Modifiers::ALT);
        assert_eq!(hotkey.key, 'Q' as u32);
        assert_eq!(hotkey.to_string(), "Ctrl+Alt+Q");
    }

    #[test]
    fn test_modifiers_use_os_bits() {
        let hotkey = HotKey::parse("Win+Shift+Ctrl+Alt+A").unwrap();
        assert_eq!(hotkey.modifiers.bits(), 0x000F);
        assert_eq!(hotkey.to_string(), "Ctrl+Alt+Shift+Win+A");
        assert!(Modifiers::default().is_empty());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let a: HotKey = "ctrl+SHIFT+f5".parse().unwrap();
        let b: HotKey = " Ctrl + Shift + F5 ".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key, 0x74);
        assert_eq!(HotKey::parse("WIN+esc").unwrap().key, vk::ESCAPE);
        assert_eq!(HotKey::parse("Alt+Space").unwrap().key, vk::SPACE);
        assert_eq!(HotKey::parse("Alt+tab").unwrap().key, vk::TAB);
        assert_eq!(HotKey::parse("Alt+7").unwrap().key, '7' as u32);
        assert_eq!(HotKey::parse("Alt+F12").unwrap().key, vk::F12);
        assert_eq!(HotKey::parse("alt+q"), HotKey::parse("Alt+Q"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            HotKey::parse("Q"),
            Err(HotKeyError::MissingModifier("Q".to_string()))
        );
        assert_eq!(
            HotKey::parse("Ctrl+"),
            Err(HotKeyError::InvalidFormat("Ctrl+".to_string()))
        );
        assert_eq!(
            HotKey::parse("Hyper+Q"),
            Err(HotKeyError::UnknownModifier("Hyper".to_string()))
        );
        assert_eq!(
            HotKey::parse("Ctrl+Enter"),
            Err(HotKeyError::UnknownKey("Enter".to_string()))
        );
        assert!(matches!(HotKey::parse("Ctrl+F13"), Err(HotKeyError::UnknownKey(_))));
        assert!(matches!(HotKey::parse("Ctrl+F01"), Err(HotKeyError::UnknownKey(_))));
        assert!(matches!(HotKey::parse("Ctrl+Alt"), Err(HotKeyError::UnknownKey(_))));
        assert!(matches!(HotKey::parse("Ctrl+é"), Err(HotKeyError::UnknownKey(_))));
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut table = HotKeyTable::new();
        let a = table.register(HotKey::parse("Ctrl+A").unwrap(), "a", ok).unwrap();
        let b = table.register(HotKey::parse("Ctrl+B").unwrap(), "b", ok).unwrap();
        assert_eq!((a, b), (1, 2));

        table.unregister(a, |_| {});
        let c = table.register(HotKey::parse("Ctrl+C").unwrap(), "c", ok).unwrap();
        assert_eq!(c, 3);
        assert_eq!(table.handler(c), Some(&"c"));
        assert_eq!(table.handler(a), None);
    }

    #[test]
    fn test_failed_native_registration_stores_nothing() {
        let mut table: HotKeyTable<()> = HotKeyTable::new();
        let err = table
            .register(HotKey::parse("Ctrl+A").unwrap(), (), |_, hotkey| {
                Err(HotKeyError::Denied {
                    hotkey: hotkey.to_string(),
                    reason: "taken".to_string(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, HotKeyError::Denied { .. }));
        assert!(table.is_empty());

        // The id was not consumed.
        let id = table.register(HotKey::parse("Ctrl+A").unwrap(), (), ok).unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_duplicate_combination_rejected() {
        let mut table = HotKeyTable::new();
        table.register(HotKey::parse("Ctrl+A").unwrap(), 1, ok).unwrap();
        let err = table
            .register(HotKey::parse("ctrl+a").unwrap(), 2, ok)
            .unwrap_err();
        assert!(matches!(err, HotKeyError::Denied { .. }));
    }

    #[test]
    fn test_ids_recycled_after_range_is_used() {
        let mut table = HotKeyTable::new();
        table.next_id = MAX_HOTKEY_ID;
        let last = table.register(HotKey::parse("Ctrl+A").unwrap(), (), ok).unwrap();
        assert_eq!(last, MAX_HOTKEY_ID);

        let recycled = table.register(HotKey::parse("Ctrl+B").unwrap(), (), ok).unwrap();
        assert_eq!(recycled, 1);
        let next = table.register(HotKey::parse("Ctrl+C").unwrap(), (), ok).unwrap();
        assert_eq!(next, 2);
    }

    #[test]
    fn test_find_and_clear() {
        let mut table = HotKeyTable::new();
        let hotkey = HotKey::parse("Shift+Win+Z").unwrap();
        let id = table.register(hotkey, (), ok).unwrap();
        assert_eq!(table.find(&hotkey), Some(id));
        assert_eq!(table.hotkey(id), Some(hotkey));

        let mut released = Vec::new();
        assert_eq!(table.clear(|id| released.push(id)), 1);
        assert_eq!(released, vec![id]);
        assert!(table.is_empty());
    }
}
