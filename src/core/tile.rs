//! Tile kinds and the grid snapshot the mesh is built from.
//!
//! Every tile identifier is resolved once, when the grid is ingested, into a
//! closed [`TileKind`]. Per-kind properties (traversability, permanence, hazard
//! radius, angled-wall shape) come from a single lookup, [`TileKind::properties`].
//!
//! Grids are indexed `[x][y]` with `y` growing downward, matching screen space.
//! World coordinates are tile indices scaled by [`TileGrid::pixels_per_tile`].

#![forbid(unsafe_code)]

use crate::geometry::point::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default tile edge length in world units.
pub const DEFAULT_PIXELS_PER_TILE: u32 = 40;

/// Errors raised while ingesting a grid snapshot.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TileGridError {
    /// The grid has no tiles.
    #[error("Tile grid is empty")]
    Empty,

    /// Rows (or columns) have different lengths.
    #[error("Row {row} has {found} tiles, expected {expected}")]
    RaggedRows {
        /// Index of the offending row or column.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// A character in a textual grid has no tile kind.
    #[error("Unknown tile symbol {symbol:?} at ({x}, {y})")]
    UnknownSymbol {
        /// The unrecognized character.
        symbol: char,
        /// Tile column.
        x: usize,
        /// Tile row.
        y: usize,
    },

    /// A numeric tile identifier has no tile kind.
    #[error("Unknown tile identifier {id} at ({x}, {y})")]
    UnknownId {
        /// The unrecognized identifier.
        id: f64,
        /// Tile column.
        x: usize,
        /// Tile row.
        y: usize,
    },

    /// The tile size must be positive.
    #[error("Tile size must be positive")]
    InvalidTileSize,
}

/// Which triangular half of an angled wall tile is traversable.
///
/// The name gives the two sides of the tile that the open half touches:
/// `UpRight` is open on its top and right sides and walled along the diagonal
/// from the top-left to the bottom-right corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AngledWallOrientation {
    /// Open towards the top and the right.
    UpRight,
    /// Open towards the bottom and the right.
    DownRight,
    /// Open towards the bottom and the left.
    DownLeft,
    /// Open towards the top and the left.
    UpLeft,
}

impl AngledWallOrientation {
    /// All four orientations.
    pub const ALL: [Self; 4] = [Self::UpRight, Self::DownRight, Self::DownLeft, Self::UpLeft];

    /// Open half touches the tile's top side.
    #[must_use]
    pub const fn faces_up(self) -> bool {
        matches!(self, Self::UpRight | Self::UpLeft)
    }

    /// Open half touches the tile's bottom side.
    #[must_use]
    pub const fn faces_down(self) -> bool {
        matches!(self, Self::DownRight | Self::DownLeft)
    }

    /// Open half touches the tile's left side.
    #[must_use]
    pub const fn faces_left(self) -> bool {
        matches!(self, Self::DownLeft | Self::UpLeft)
    }

    /// Open half touches the tile's right side.
    #[must_use]
    pub const fn faces_right(self) -> bool {
        matches!(self, Self::UpRight | Self::DownRight)
    }

    /// Returns `true` if the wall runs from the top-left to the bottom-right
    /// corner, `false` if it runs from the bottom-left to the top-right.
    #[must_use]
    pub const fn descending_diagonal(self) -> bool {
        matches!(self, Self::UpRight | Self::DownLeft)
    }
}

/// State of a gate tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateState {
    /// The gate can be crossed.
    Open,
    /// The gate blocks movement.
    Closed,
}

/// Closed set of tile kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Outside the playable area.
    Empty,
    /// Plain floor.
    Floor,
    /// Solid square wall.
    Wall,
    /// Half wall, split along a diagonal.
    AngledWall(AngledWallOrientation),
    /// Static hazard.
    Spike,
    /// Hazard that disappears and respawns.
    Bomb,
    /// Floor switch.
    Button,
    /// Speed pad.
    Boost,
    /// Collectible that respawns.
    Powerup,
    /// Flag station.
    Flag,
    /// Gate that opens and closes.
    Gate(GateState),
    /// Teleporter.
    Portal,
    /// Capture zone.
    Endzone,
}

/// Static properties of a [`TileKind`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileProperties {
    /// Agents may stand on the tile.
    pub traversable: bool,
    /// The tile never changes during a session.
    pub permanent: bool,
    /// Collision radius of a round obstacle, if any.
    pub radius: Option<f64>,
    /// Shape of an angled wall.
    pub wall_orientation: Option<AngledWallOrientation>,
}

impl TileProperties {
    const fn new(traversable: bool, permanent: bool) -> Self {
        Self {
            traversable,
            permanent,
            radius: None,
            wall_orientation: None,
        }
    }

    const fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }
}

impl TileKind {
    /// Property lookup for this kind.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use navmesh::core::tile::{GateState, TileKind};
    ///
    /// assert!(TileKind::Floor.properties().traversable);
    /// assert!(!TileKind::Gate(GateState::Closed).properties().permanent);
    /// assert_eq!(TileKind::Spike.properties().radius, Some(14.0));
    /// ```
    #[must_use]
    pub const fn properties(self) -> TileProperties {
        match self {
            Self::Empty | Self::Wall => TileProperties::new(false, true),
            Self::Floor | Self::Endzone => TileProperties::new(true, true),
            Self::AngledWall(orientation) => TileProperties {
                wall_orientation: Some(orientation),
                ..TileProperties::new(false, true)
            },
            Self::Spike => TileProperties::new(false, true).with_radius(14.0),
            Self::Bomb => TileProperties::new(false, false).with_radius(15.0),
            Self::Button => TileProperties::new(true, true).with_radius(8.0),
            Self::Boost => TileProperties::new(false, false).with_radius(15.0),
            Self::Portal => TileProperties::new(false, false).with_radius(15.0),
            Self::Powerup | Self::Flag | Self::Gate(GateState::Open) => {
                TileProperties::new(true, false)
            }
            Self::Gate(GateState::Closed) => TileProperties::new(false, false),
        }
    }

    /// Agents may stand on the tile.
    #[inline]
    #[must_use]
    pub const fn is_traversable(self) -> bool {
        self.properties().traversable
    }

    /// The tile never changes during a session.
    #[inline]
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.properties().permanent
    }

    /// Orientation if this is an angled wall.
    #[inline]
    #[must_use]
    pub const fn angled_wall(self) -> Option<AngledWallOrientation> {
        self.properties().wall_orientation
    }

    /// Resolves a numeric tile identifier.
    ///
    /// Identifiers use one decimal place for variants, e.g. `1.1` to `1.4` for
    /// the four angled walls and `9.1` to `9.3` for closed gates.
    #[must_use]
    pub fn from_id(id: f64) -> Option<Self> {
        if !id.is_finite() || id < 0.0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, reason = "identifiers are small")]
        let code = (id * 10.0).round() as i64;
        let kind = match code {
            0 => Self::Empty,
            10 => Self::Wall,
            11 => Self::AngledWall(AngledWallOrientation::UpRight),
            12 => Self::AngledWall(AngledWallOrientation::DownRight),
            13 => Self::AngledWall(AngledWallOrientation::DownLeft),
            14 => Self::AngledWall(AngledWallOrientation::UpLeft),
            20 | 110 | 120 => Self::Floor,
            30 | 31 | 40 | 41 | 160 | 161 => Self::Flag,
            50 | 51 | 140 | 141 | 150 | 151 => Self::Boost,
            60..=64 => Self::Powerup,
            70 => Self::Spike,
            80 => Self::Button,
            90 => Self::Gate(GateState::Open),
            91..=93 => Self::Gate(GateState::Closed),
            100 | 101 => Self::Bomb,
            130 | 131 => Self::Portal,
            170 | 180 => Self::Endzone,
            _ => return None,
        };
        Some(kind)
    }

    /// Resolves a character of a textual grid.
    ///
    /// Angled walls use the numeric keypad layout: `9` is open up-right, `3`
    /// down-right, `1` down-left and `7` up-left.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        let kind = match symbol {
            '-' | ' ' => Self::Empty,
            '.' => Self::Floor,
            '#' => Self::Wall,
            '9' => Self::AngledWall(AngledWallOrientation::UpRight),
            '3' => Self::AngledWall(AngledWallOrientation::DownRight),
            '1' => Self::AngledWall(AngledWallOrientation::DownLeft),
            '7' => Self::AngledWall(AngledWallOrientation::UpLeft),
            's' => Self::Spike,
            'b' => Self::Bomb,
            'o' => Self::Button,
            '>' => Self::Boost,
            'p' => Self::Powerup,
            'f' => Self::Flag,
            'g' => Self::Gate(GateState::Open),
            'G' => Self::Gate(GateState::Closed),
            '@' => Self::Portal,
            'e' => Self::Endzone,
            _ => return None,
        };
        Some(kind)
    }

    /// Character used for this kind in textual grids.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Empty => '-',
            Self::Floor => '.',
            Self::Wall => '#',
            Self::AngledWall(AngledWallOrientation::UpRight) => '9',
            Self::AngledWall(AngledWallOrientation::DownRight) => '3',
            Self::AngledWall(AngledWallOrientation::DownLeft) => '1',
            Self::AngledWall(AngledWallOrientation::UpLeft) => '7',
            Self::Spike => 's',
            Self::Bomb => 'b',
            Self::Button => 'o',
            Self::Boost => '>',
            Self::Powerup => 'p',
            Self::Flag => 'f',
            Self::Gate(GateState::Open) => 'g',
            Self::Gate(GateState::Closed) => 'G',
            Self::Portal => '@',
            Self::Endzone => 'e',
        }
    }
}

/// A tile whose kind may change during a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutableTile {
    /// Tile column.
    pub x: usize,
    /// Tile row.
    pub y: usize,
    /// Kind at the time of the snapshot.
    pub kind: TileKind,
}

/// Rectangular snapshot of tile kinds, indexed `[x][y]`.
///
/// # Examples
///
/// ```rust
/// use navmesh::core::tile::{TileGrid, TileKind};
///
/// let grid = TileGrid::parse("####\n#..#\n####", 40).unwrap();
/// assert_eq!((grid.width(), grid.height()), (4, 3));
/// assert_eq!(grid.kind(1, 1), Some(TileKind::Floor));
/// assert!(!grid.is_traversable(0, 1));
/// assert_eq!(grid.tile_center(1, 1).x(), 60.0);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    width: usize,
    height: usize,
    pixels_per_tile: u32,
    // Column-major: tiles[x * height + y].
    tiles: Vec<TileKind>,
}

impl TileGrid {
    /// Builds a grid from columns, `columns[x][y]`.
    ///
    /// # Errors
    ///
    /// Returns [`TileGridError::Empty`] for an empty grid,
    /// [`TileGridError::RaggedRows`] if the columns differ in length and
    /// [`TileGridError::InvalidTileSize`] for a zero tile size.
    pub fn new(columns: Vec<Vec<TileKind>>, pixels_per_tile: u32) -> Result<Self, TileGridError> {
        if pixels_per_tile == 0 {
            return Err(TileGridError::InvalidTileSize);
        }
        let width = columns.len();
        let height = columns.first().map_or(0, Vec::len);
        if width == 0 || height == 0 {
            return Err(TileGridError::Empty);
        }
        if let Some((row, column)) = columns.iter().enumerate().find(|(_, c)| c.len() != height) {
            return Err(TileGridError::RaggedRows {
                row,
                expected: height,
                found: column.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels_per_tile,
            tiles: columns.into_iter().flatten().collect(),
        })
    }

    /// Builds a grid from numeric identifiers, `ids[x][y]`.
    ///
    /// # Errors
    ///
    /// As [`TileGrid::new`], plus [`TileGridError::UnknownId`] for an
    /// identifier with no tile kind.
    pub fn from_ids(ids: &[Vec<f64>], pixels_per_tile: u32) -> Result<Self, TileGridError> {
        let columns = ids
            .iter()
            .enumerate()
            .map(|(x, column)| {
                column
                    .iter()
                    .enumerate()
                    .map(|(y, &id)| {
                        TileKind::from_id(id).ok_or(TileGridError::UnknownId { id, x, y })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(columns, pixels_per_tile)
    }

    /// Parses a textual grid, one line per row (`y`), one character per
    /// column (`x`). See [`TileKind::from_symbol`] for the alphabet.
    ///
    /// # Errors
    ///
    /// As [`TileGrid::new`], plus [`TileGridError::UnknownSymbol`].
    pub fn parse(text: &str, pixels_per_tile: u32) -> Result<Self, TileGridError> {
        let rows = text
            .lines()
            .enumerate()
            .map(|(y, line)| {
                line.chars()
                    .enumerate()
                    .map(|(x, symbol)| {
                        TileKind::from_symbol(symbol)
                            .ok_or(TileGridError::UnknownSymbol { symbol, x, y })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let width = rows.first().map_or(0, Vec::len);
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != width)
        {
            return Err(TileGridError::RaggedRows {
                row,
                expected: width,
                found,
            });
        }
        let columns = (0..width)
            .map(|x| rows.iter().map(|row| row[x]).collect())
            .collect();
        Self::new(columns, pixels_per_tile)
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Tile edge length in world units.
    #[must_use]
    pub const fn pixels_per_tile(&self) -> u32 {
        self.pixels_per_tile
    }

    /// Kind at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn kind(&self, x: usize, y: usize) -> Option<TileKind> {
        (x < self.width && y < self.height).then(|| self.tiles[x * self.height + y])
    }

    /// Returns `true` if `(x, y)` is inside the grid and traversable.
    #[must_use]
    pub fn is_traversable(&self, x: usize, y: usize) -> bool {
        self.kind(x, y).is_some_and(TileKind::is_traversable)
    }

    /// Orientation of the angled wall at `(x, y)`, if there is one.
    #[must_use]
    pub fn angled_wall(&self, x: usize, y: usize) -> Option<AngledWallOrientation> {
        self.kind(x, y).and_then(TileKind::angled_wall)
    }

    /// Replaces the kind at `(x, y)`; returns the previous kind, or `None`
    /// outside the grid.
    pub fn set_kind(&mut self, x: usize, y: usize, kind: TileKind) -> Option<TileKind> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let slot = &mut self.tiles[x * self.height + y];
        Some(std::mem::replace(slot, kind))
    }

    /// World position of the tile's top-left corner.
    #[must_use]
    pub fn tile_origin(&self, x: usize, y: usize) -> Point {
        let size = f64::from(self.pixels_per_tile);
        #[allow(clippy::cast_precision_loss, reason = "grid indices are small")]
        let (x, y) = (x as f64, y as f64);
        Point::new(x * size, y * size)
    }

    /// World position of the tile's centre.
    #[must_use]
    pub fn tile_center(&self, x: usize, y: usize) -> Point {
        let half = f64::from(self.pixels_per_tile) * 0.5;
        self.tile_origin(x, y).offset(half, half)
    }

    /// Tile containing world point `p`, or `None` outside the grid.
    #[must_use]
    pub fn tile_at(&self, p: &Point) -> Option<(usize, usize)> {
        let size = f64::from(self.pixels_per_tile);
        let (fx, fy) = ((p.x() / size).floor(), (p.y() / size).floor());
        if !(fx >= 0.0 && fy >= 0.0) {
            return None;
        }
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "checked non-negative, bounded below"
        )]
        let (x, y) = (fx as usize, fy as usize);
        (x < self.width && y < self.height).then_some((x, y))
    }

    /// Iterates `(x, y, kind)` in column-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, TileKind)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .map(|(i, &kind)| (i / self.height, i % self.height, kind))
    }

    /// Locations and kinds of every non-permanent tile.
    #[must_use]
    pub fn mutable_tiles(&self) -> Vec<MutableTile> {
        self.iter()
            .filter(|(_, _, kind)| !kind.is_permanent())
            .map(|(x, y, kind)| MutableTile { x, y, kind })
            .collect()
    }

    /// Returns `true` if both grids have the same shape, scale, traversability
    /// and angled walls, i.e. they produce the same boundary.
    #[must_use]
    pub fn same_geometry(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.pixels_per_tile == other.pixels_per_tile
            && self.tiles.iter().zip(&other.tiles).all(|(a, b)| {
                a.is_traversable() == b.is_traversable() && a.angled_wall() == b.angled_wall()
            })
    }
}

impl fmt::Display for TileGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            if y > 0 {
                writeln!(f)?;
            }
            for x in 0..self.width {
                write!(f, "{}", self.tiles[x * self.height + y].symbol())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip_through_display() {
        let text = "#####\n#9.7#\n#.sp#\n#3G1#\n#####";
        let grid = TileGrid::parse(text, 40).unwrap();
        assert_eq!(grid.to_string(), text);
        assert_eq!(
            grid.angled_wall(1, 1),
            Some(AngledWallOrientation::UpRight)
        );
        assert_eq!(grid.kind(2, 3), Some(TileKind::Gate(GateState::Closed)));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            TileGrid::parse("##\n#", 40),
            Err(TileGridError::RaggedRows { row: 1, expected: 2, found: 1 })
        );
        assert_eq!(
            TileGrid::parse("#x", 40),
            Err(TileGridError::UnknownSymbol { symbol: 'x', x: 1, y: 0 })
        );
        assert_eq!(TileGrid::parse("", 40), Err(TileGridError::Empty));
        assert_eq!(TileGrid::parse("#", 0), Err(TileGridError::InvalidTileSize));
    }

    #[test]
    fn numeric_identifiers_are_indexed_by_column() {
        let ids = vec![vec![1.0, 1.0, 1.0], vec![1.0, 2.0, 1.0], vec![1.0, 1.3, 1.0]];
        let grid = TileGrid::from_ids(&ids, 40).unwrap();
        assert_eq!(grid.width(), 3);
        assert!(grid.is_traversable(1, 1));
        assert_eq!(grid.angled_wall(2, 1), Some(AngledWallOrientation::DownLeft));
        assert!(matches!(
            TileGrid::from_ids(&[vec![42.0]], 40),
            Err(TileGridError::UnknownId { x: 0, y: 0, .. })
        ));
    }

    #[test]
    fn orientation_faces_are_consistent() {
        for o in AngledWallOrientation::ALL {
            assert_ne!(o.faces_up(), o.faces_down());
            assert_ne!(o.faces_left(), o.faces_right());
        }
        assert!(AngledWallOrientation::UpRight.descending_diagonal());
        assert!(!AngledWallOrientation::UpLeft.descending_diagonal());
    }

    #[test]
    fn coordinates_and_lookup() {
        let grid = TileGrid::parse("...\n...", 40).unwrap();
        assert_eq!(grid.tile_origin(2, 1), Point::new(80.0, 40.0));
        assert_eq!(grid.tile_center(0, 0), Point::new(20.0, 20.0));
        assert_eq!(grid.tile_at(&Point::new(85.0, 79.9)), Some((2, 1)));
        assert_eq!(grid.tile_at(&Point::new(-1.0, 10.0)), None);
        assert_eq!(grid.tile_at(&Point::new(120.0, 10.0)), None);
    }

    #[test]
    fn mutable_tiles_and_geometry_changes() {
        let mut grid = TileGrid::parse("#.b\n#g.", 40).unwrap();
        let mutable = grid.mutable_tiles();
        assert_eq!(
            mutable,
            vec![
                MutableTile { x: 1, y: 1, kind: TileKind::Gate(GateState::Open) },
                MutableTile { x: 2, y: 0, kind: TileKind::Bomb },
            ]
        );

        let before = grid.clone();
        grid.set_kind(1, 0, TileKind::Powerup);
        assert!(grid.same_geometry(&before));
        grid.set_kind(1, 1, TileKind::Gate(GateState::Closed));
        assert!(!grid.same_geometry(&before));
    }
}
