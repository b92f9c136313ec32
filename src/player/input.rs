//! Direct input on a page: selection changes and pointer gestures

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    #[default]
    Alt,
    Ctrl,
    Shift,
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn only(modifier: Modifier) -> Self {
        let mut modifiers = Self::default();
        match modifier {
            Modifier::Alt => modifiers.alt = true,
            Modifier::Ctrl => modifiers.ctrl = true,
            Modifier::Shift => modifiers.shift = true,
            Modifier::Meta => modifiers.meta = true,
        }
        modifiers
    }

    pub fn is_held(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Alt => self.alt,
            Modifier::Ctrl => self.ctrl,
            Modifier::Shift => self.shift,
            Modifier::Meta => self.meta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn primary_with(modifier: Modifier) -> Self {
        Self {
            button: PointerButton::Primary,
            modifiers: Modifiers::only(modifier),
        }
    }
}

/// What the page should do with the browser's default handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureDisposition {
    /// The gesture was consumed; suppress default handling
    Suppress,
    PassThrough,
}

/// DOM-side events fed into a page context
#[derive(Debug, Clone, PartialEq)]
pub enum PageInput {
    /// The text selection changed (empty string clears it)
    Select(String),
    PointerDown(PointerEvent),
}

pub fn is_speak_gesture(event: &PointerEvent, modifier: Modifier) -> bool {
    event.button == PointerButton::Primary && event.modifiers.is_held(modifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speak_gesture_needs_modifier_and_primary() {
        assert!(is_speak_gesture(&PointerEvent::primary_with(Modifier::Alt), Modifier::Alt));
        assert!(!is_speak_gesture(&PointerEvent::primary_with(Modifier::Ctrl), Modifier::Alt));

        let secondary = PointerEvent {
            button: PointerButton::Secondary,
            modifiers: Modifiers::only(Modifier::Alt),
        };
        assert!(!is_speak_gesture(&secondary, Modifier::Alt));

        let plain = PointerEvent {
            button: PointerButton::Primary,
            modifiers: Modifiers::default(),
        };
        assert!(!is_speak_gesture(&plain, Modifier::Alt));
    }
}
