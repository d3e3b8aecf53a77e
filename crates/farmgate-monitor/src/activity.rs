//! The input events that count as "the user is still here".

use std::fmt;

/// A qualifying user-interaction event.
///
/// Only these four reset the inactivity timer. Passive events such as
/// pointer movement or focus changes deliberately don't: a cursor resting
/// on a price chart shouldn't keep a session alive for hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    PointerDown,
    KeyDown,
    Scroll,
    TouchStart,
}

impl ActivityKind {
    /// Every qualifying kind, in subscription order.
    pub const ALL: [ActivityKind; 4] = [
        Self::PointerDown,
        Self::KeyDown,
        Self::Scroll,
        Self::TouchStart,
    ];

    /// Maps a DOM event name to its kind. Returns `None` for events that
    /// don't qualify.
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pointerdown" | "mousedown" => Some(Self::PointerDown),
            "keydown" => Some(Self::KeyDown),
            "scroll" | "wheel" => Some(Self::Scroll),
            "touchstart" => Some(Self::TouchStart),
            _ => None,
        }
    }

    /// The canonical DOM event name for this kind.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::PointerDown => "pointerdown",
            Self::KeyDown => "keydown",
            Self::Scroll => "scroll",
            Self::TouchStart => "touchstart",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}
