//! On-screen widget mirroring the movement keys.

pub const KEY_UP_COLOR: [u8; 4] = [40, 60, 230, 255];
pub const KEY_DOWN_COLOR: [u8; 4] = [230, 40, 40, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKey {
    W,
    A,
    S,
    D,
    Shift,
}

impl DisplayKey {
    pub fn label(self) -> &'static str {
        match self {
            DisplayKey::W => "W",
            DisplayKey::A => "A",
            DisplayKey::S => "S",
            DisplayKey::D => "D",
            DisplayKey::Shift => "SHIFT",
        }
    }

    /// Matches a key name case-insensitively, the way key events report it.
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "w" => Some(DisplayKey::W),
            "a" => Some(DisplayKey::A),
            "s" => Some(DisplayKey::S),
            "d" => Some(DisplayKey::D),
            "shift" => Some(DisplayKey::Shift),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyDisplayEntry {
    pub key: DisplayKey,
    pub is_down: bool,
    pub left_px: i32,
    pub top_px: i32,
}

impl KeyDisplayEntry {
    pub fn color(&self) -> [u8; 4] {
        if self.is_down {
            KEY_DOWN_COLOR
        } else {
            KEY_UP_COLOR
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyDisplay {
    entries: [KeyDisplayEntry; 5],
}

impl KeyDisplay {
    pub fn new(window_width: u32, window_height: u32) -> Self {
        let entry = |key| KeyDisplayEntry {
            key,
            is_down: false,
            left_px: 0,
            top_px: 0,
        };
        let mut display = Self {
            entries: [
                entry(DisplayKey::W),
                entry(DisplayKey::A),
                entry(DisplayKey::S),
                entry(DisplayKey::D),
                entry(DisplayKey::Shift),
            ],
        };
        display.update_position(window_width, window_height);
        display
    }

    pub fn down(&mut self, key: DisplayKey) {
        self.set(key, true);
    }

    pub fn up(&mut self, key: DisplayKey) {
        self.set(key, false);
    }

    pub fn release_all(&mut self) {
        for entry in &mut self.entries {
            entry.is_down = false;
        }
    }

    pub fn is_down(&self, key: DisplayKey) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.key == key && entry.is_down)
    }

    pub fn update_position(&mut self, _window_width: u32, window_height: u32) {
        let height = window_height as i32;
        for entry in &mut self.entries {
            let (left, top) = match entry.key {
                DisplayKey::W => (300, height - 150),
                DisplayKey::A => (200, height - 100),
                DisplayKey::S => (300, height - 100),
                DisplayKey::D => (400, height - 100),
                DisplayKey::Shift => (50, height - 100),
            };
            entry.left_px = left;
            entry.top_px = top;
        }
    }

    pub fn entries(&self) -> &[KeyDisplayEntry] {
        &self.entries
    }

    fn set(&mut self, key: DisplayKey, is_down: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.key == key) {
            entry.is_down = is_down;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_are_case_insensitive() {
        assert_eq!(DisplayKey::from_key_name("W"), Some(DisplayKey::W));
        assert_eq!(DisplayKey::from_key_name("Shift"), Some(DisplayKey::Shift));
        assert_eq!(DisplayKey::from_key_name("q"), None);
    }

    #[test]
    fn down_and_up_toggle_color() {
        let mut display = KeyDisplay::new(1280, 720);
        display.down(DisplayKey::A);
        let a = display.entries()[1];
        assert!(a.is_down);
        assert_eq!(a.color(), KEY_DOWN_COLOR);

        display.up(DisplayKey::A);
        assert!(!display.is_down(DisplayKey::A));
        assert_eq!(display.entries()[1].color(), KEY_UP_COLOR);
    }

    #[test]
    fn positions_follow_window_height() {
        let mut display = KeyDisplay::new(1280, 720);
        let w = display.entries()[0];
        assert_eq!((w.left_px, w.top_px), (300, 570));

        display.update_position(800, 600);
        let shift = display.entries()[4];
        assert_eq!((shift.left_px, shift.top_px), (50, 500));
    }
}
