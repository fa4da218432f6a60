use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Buttons and modifiers held while a pointer event happened.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PointerInput: u8 {
        const LEFT    = 1;
        const RIGHT   = 1 << 1;
        const MIDDLE  = 1 << 2;
        const ALT     = 1 << 3;
        const CONTROL = 1 << 4;
    }
}

impl PointerInput {
    pub const fn left_button(self) -> bool {
        self.contains(Self::LEFT)
    }

    pub const fn right_button(self) -> bool {
        self.contains(Self::RIGHT)
    }

    pub const fn middle_button(self) -> bool {
        self.contains(Self::MIDDLE)
    }

    pub const fn alt_held(self) -> bool {
        self.contains(Self::ALT)
    }

    pub const fn control_held(self) -> bool {
        self.contains(Self::CONTROL)
    }

    /// Right button, or a left click with a modifier for single-button pointers.
    pub const fn is_alternate(self) -> bool {
        self.right_button() || (self.left_button() && (self.alt_held() || self.control_held()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_click_counts_as_alternate() {
        assert!(PointerInput::RIGHT.is_alternate());
        assert!((PointerInput::LEFT | PointerInput::CONTROL).is_alternate());
        assert!(!PointerInput::LEFT.is_alternate());
        assert!(!PointerInput::ALT.is_alternate());
    }
}
