use serde::{Deserialize, Serialize};

/// Unique identifier for a racer within one lobby.
pub type PlayerId = u64;

/// A roster entry handed over by the lobby when a race starts.
///
/// Display fields are owned by the lobby; the simulation only copies them into
/// its per-race records and never writes them back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub color: PlayerColor,
}

/// Avatar color selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for PlayerColor {
    fn default() -> Self {
        Self::PALETTE[0]
    }
}

impl PlayerColor {
    /// Predefined palette colors for player selection.
    pub const PALETTE: &[PlayerColor] = &[
        PlayerColor {
            r: 255,
            g: 87,
            b: 87,
        }, // Red
        PlayerColor {
            r: 78,
            g: 205,
            b: 196,
        }, // Teal
        PlayerColor {
            r: 255,
            g: 195,
            b: 18,
        }, // Yellow
        PlayerColor {
            r: 130,
            g: 88,
            b: 255,
        }, // Purple
        PlayerColor {
            r: 46,
            g: 213,
            b: 115,
        }, // Green
        PlayerColor {
            r: 255,
            g: 148,
            b: 77,
        }, // Orange
    ];

    /// Palette color for a roster slot, cycling when the roster outgrows the palette.
    pub fn for_slot(slot: usize) -> Self {
        Self::PALETTE[slot % Self::PALETTE.len()]
    }
}
