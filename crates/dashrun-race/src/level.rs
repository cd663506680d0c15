use serde::{Deserialize, Serialize};

pub const MIN_WIDTH: u32 = 20;
pub const MAX_WIDTH: u32 = 200;
pub const MIN_HEIGHT: u32 = 10;
pub const MAX_HEIGHT: u32 = 30;

/// Tile types for the race grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    Empty,
    Solid,
    Hazard,
    Start,
    Finish,
    Checkpoint,
}

impl TileKind {
    /// Start and finish pads collide like solid ground.
    pub fn is_solid(self) -> bool {
        matches!(self, TileKind::Solid | TileKind::Start | TileKind::Finish)
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' => Some(TileKind::Empty),
            '#' => Some(TileKind::Solid),
            '^' => Some(TileKind::Hazard),
            'S' => Some(TileKind::Start),
            'F' => Some(TileKind::Finish),
            'C' => Some(TileKind::Checkpoint),
            _ => None,
        }
    }
}

/// How a level is raced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceMode {
    /// Reach the finish once.
    Sprint,
    /// Visit every checkpoint in order for the required number of laps, then finish.
    Lap,
}

/// A static race level. Never mutated once a race owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: String,
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    pub mode: RaceMode,
    /// Column-major tile data (`x * height + y`).
    pub tiles: Vec<TileKind>,
    /// Ordered checkpoint tile indices (lap mode only).
    pub checkpoints: Vec<usize>,
}

impl Level {
    /// An all-empty grid. Useful as a base for hand-built levels.
    pub fn empty(id: &str, width: u32, height: u32, mode: RaceMode) -> Self {
        Self {
            id: id.to_string(),
            width,
            height,
            mode,
            tiles: vec![TileKind::Empty; width as usize * height as usize],
            checkpoints: Vec::new(),
        }
    }

    /// Build a level from rows of glyphs, top row first.
    ///
    /// `.` empty, `#` solid, `^` hazard, `S` start, `F` finish, `C` checkpoint.
    /// In lap mode the checkpoint order is tile-index order, i.e. left to right.
    /// The result is not validated; see [`Level::validate`].
    pub fn from_ascii(id: &str, mode: RaceMode, rows: &[&str]) -> Result<Self, LevelError> {
        let Some(first) = rows.first() else {
            return Err(LevelError::HeightOutOfRange(0));
        };
        let width = first.chars().count();
        let height = rows.len();
        let mut level = Level::empty(id, width as u32, height as u32, mode);

        for (y, row) in rows.iter().enumerate() {
            let actual = row.chars().count();
            if actual != width {
                return Err(LevelError::RaggedRows {
                    row: y,
                    expected: width,
                    actual,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let kind = TileKind::from_glyph(glyph).ok_or(LevelError::UnknownGlyph {
                    glyph,
                    x,
                    y,
                })?;
                let idx = level.index(x as i32, y as i32);
                level.tiles[idx] = kind;
            }
        }

        if mode == RaceMode::Lap {
            level.checkpoints = level
                .tiles
                .iter()
                .enumerate()
                .filter(|(_, kind)| **kind == TileKind::Checkpoint)
                .map(|(idx, _)| idx)
                .collect();
        }
        Ok(level)
    }

    pub fn index(&self, x: i32, y: i32) -> usize {
        x as usize * self.height as usize + y as usize
    }

    /// Tile coordinates of a tile index.
    pub fn tile_coords(&self, idx: usize) -> (i32, i32) {
        let h = self.height.max(1) as usize;
        ((idx / h) as i32, (idx % h) as i32)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width as i32 && y < self.height as i32
    }

    /// Out-of-range queries return `Empty`.
    pub fn kind_at(&self, x: i32, y: i32) -> TileKind {
        if !self.in_bounds(x, y) {
            return TileKind::Empty;
        }
        self.tiles
            .get(self.index(x, y))
            .copied()
            .unwrap_or(TileKind::Empty)
    }

    pub fn is_solid_at(&self, x: i32, y: i32) -> bool {
        self.kind_at(x, y).is_solid()
    }

    pub fn set_tile(&mut self, x: i32, y: i32, kind: TileKind) {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            self.tiles[idx] = kind;
        }
    }

    /// First start tile in index order.
    pub fn start_tile(&self) -> Option<(i32, i32)> {
        self.tiles
            .iter()
            .position(|t| *t == TileKind::Start)
            .map(|idx| self.tile_coords(idx))
    }

    pub fn pixel_width(&self, tile_size: f32) -> f32 {
        self.width as f32 * tile_size
    }

    pub fn pixel_height(&self, tile_size: f32) -> f32 {
        self.height as f32 * tile_size
    }

    /// Reject levels the simulation cannot race on.
    pub fn validate(&self) -> Result<(), LevelError> {
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&self.width) {
            return Err(LevelError::WidthOutOfRange(self.width));
        }
        if !(MIN_HEIGHT..=MAX_HEIGHT).contains(&self.height) {
            return Err(LevelError::HeightOutOfRange(self.height));
        }
        let expected = self.width as usize * self.height as usize;
        if self.tiles.len() != expected {
            return Err(LevelError::TileCountMismatch {
                expected,
                actual: self.tiles.len(),
            });
        }
        if self.start_tile().is_none() {
            return Err(LevelError::MissingStart);
        }
        if !self.tiles.contains(&TileKind::Finish) {
            return Err(LevelError::MissingFinish);
        }
        if self.mode == RaceMode::Lap {
            if self.checkpoints.is_empty() {
                return Err(LevelError::MissingCheckpoints);
            }
            for &idx in &self.checkpoints {
                match self.tiles.get(idx) {
                    None => return Err(LevelError::CheckpointOutOfRange(idx)),
                    Some(TileKind::Checkpoint) => {},
                    Some(_) => return Err(LevelError::CheckpointNotOnTile(idx)),
                }
            }
        }
        Ok(())
    }
}

/// Reasons a level is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    WidthOutOfRange(u32),
    HeightOutOfRange(u32),
    TileCountMismatch { expected: usize, actual: usize },
    MissingStart,
    MissingFinish,
    MissingCheckpoints,
    CheckpointOutOfRange(usize),
    CheckpointNotOnTile(usize),
    RaggedRows { row: usize, expected: usize, actual: usize },
    UnknownGlyph { glyph: char, x: usize, y: usize },
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WidthOutOfRange(w) => {
                write!(f, "width {w} outside {MIN_WIDTH}..={MAX_WIDTH}")
            },
            Self::HeightOutOfRange(h) => {
                write!(f, "height {h} outside {MIN_HEIGHT}..={MAX_HEIGHT}")
            },
            Self::TileCountMismatch { expected, actual } => {
                write!(f, "expected {expected} tiles, got {actual}")
            },
            Self::MissingStart => write!(f, "level has no start tile"),
            Self::MissingFinish => write!(f, "level has no finish tile"),
            Self::MissingCheckpoints => write!(f, "lap level has no checkpoints"),
            Self::CheckpointOutOfRange(idx) => {
                write!(f, "checkpoint index {idx} is outside the grid")
            },
            Self::CheckpointNotOnTile(idx) => {
                write!(f, "checkpoint index {idx} is not a checkpoint tile")
            },
            Self::RaggedRows {
                row,
                expected,
                actual,
            } => write!(f, "row {row} has {actual} tiles, expected {expected}"),
            Self::UnknownGlyph { glyph, x, y } => {
                write!(f, "unknown tile glyph {glyph:?} at ({x}, {y})")
            },
        }
    }
}

impl std::error::Error for LevelError {}
