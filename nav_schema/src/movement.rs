use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Snapshot of an agent's movement intent and state for one physics step.
    ///
    /// Bits not named here are carried through untouched so that newer
    /// clients can send intent this side does not understand yet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MovementFlags: u32 {
        const FORWARD       = 1 << 0;
        const BACKWARD      = 1 << 1;
        const STRAFE_LEFT   = 1 << 2;
        const STRAFE_RIGHT  = 1 << 3;
        const TURN_LEFT     = 1 << 4;
        const TURN_RIGHT    = 1 << 5;
        const PITCH_UP      = 1 << 6;
        const PITCH_DOWN    = 1 << 7;
        const WALK_MODE     = 1 << 8;
        const ON_TRANSPORT  = 1 << 9;
        const JUMPING       = 1 << 10;
        const FALLING       = 1 << 11;
        const SWIMMING      = 1 << 12;
        const FLYING        = 1 << 13;
        const ROOT          = 1 << 14;
    }
}

impl MovementFlags {
    /// Build from raw wire bits, keeping bits without a named flag.
    pub fn from_wire(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }

    pub fn is_moving_horizontally(self) -> bool {
        self.intersects(
            Self::FORWARD | Self::BACKWARD | Self::STRAFE_LEFT | Self::STRAFE_RIGHT,
        )
    }

    pub fn is_airborne(self) -> bool {
        self.intersects(Self::JUMPING | Self::FALLING)
    }
}
