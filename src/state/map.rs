use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::infra::Position;
use crate::recipes::{Item, StationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKind {
    Empty,
    Counter,
    CuttingStation,
    DeliveryStation,
}

impl CellKind {
    pub fn from_symbol(c: char) -> Option<CellKind> {
        match c {
            ' ' => Some(CellKind::Empty),
            '-' => Some(CellKind::Counter),
            '/' => Some(CellKind::CuttingStation),
            '*' => Some(CellKind::DeliveryStation),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            CellKind::Empty => ' ',
            CellKind::Counter => '-',
            CellKind::CuttingStation => '/',
            CellKind::DeliveryStation => '*',
        }
    }

    pub fn station(self) -> Option<StationKind> {
        match self {
            CellKind::CuttingStation => Some(StationKind::CuttingStation),
            CellKind::DeliveryStation => Some(StationKind::DeliveryStation),
            _ => None,
        }
    }
}

/// Static kitchen layout. Shared by every state of an episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    pub width: i32,
    pub height: i32,
    cells: Vec<CellKind>,
    by_kind: BTreeMap<CellKind, Vec<Position>>,
    stations: Vec<(Position, Rc<Item>)>,
}

impl Map {
    /// `cells` is row-major, `width * height` long.
    pub fn new(width: i32, height: i32, cells: Vec<CellKind>) -> Self {
        debug_assert_eq!(cells.len(), (width * height) as usize);

        let mut by_kind: BTreeMap<CellKind, Vec<Position>> = BTreeMap::new();
        for y in 0..height {
            for x in 0..width {
                let kind = cells[(y * width + x) as usize];
                by_kind.entry(kind).or_default().push(Position::new(x, y));
            }
        }

        // Cutting stations first, then delivery stations
        let mut stations = Vec::new();
        for kind in [CellKind::CuttingStation, CellKind::DeliveryStation] {
            let Some(station) = kind.station() else {
                continue;
            };
            let item = Rc::new(Item::from(station));
            for pos in by_kind.get(&kind).into_iter().flatten() {
                stations.push((*pos, item.clone()));
            }
        }

        Self {
            width,
            height,
            cells,
            by_kind,
            stations,
        }
    }

    pub fn get(&self, pos: &Position) -> Option<CellKind> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            return None;
        }
        self.cells.get((pos.y * self.width + pos.x) as usize).copied()
    }

    pub fn positions_of(&self, kind: CellKind) -> &[Position] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fixed stations as game objects.
    pub fn stations(&self) -> &[(Position, Rc<Item>)] {
        &self.stations
    }

    pub fn station_at(&self, pos: &Position) -> Option<&Rc<Item>> {
        self.stations
            .iter()
            .find(|(station_pos, _)| station_pos == pos)
            .map(|(_, item)| item)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, CellKind)> + '_ {
        self.cells.iter().enumerate().map(|(i, kind)| {
            let i = i as i32;
            (Position::new(i % self.width, i / self.width), *kind)
        })
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width.max(1) as usize) {
            let line: String = row.iter().map(|kind| kind.symbol()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FULL_DIVIDER, grid};

    #[test]
    fn test_lookup_and_bounds() {
        let map = grid(FULL_DIVIDER);
        assert_eq!(map.width, 7);
        assert_eq!(map.height, 7);
        assert_eq!(map.get(&Position::new(0, 1)), Some(CellKind::CuttingStation));
        assert_eq!(map.get(&Position::new(0, 3)), Some(CellKind::DeliveryStation));
        assert_eq!(map.get(&Position::new(1, 1)), Some(CellKind::Empty));
        assert_eq!(map.get(&Position::new(3, 4)), Some(CellKind::Counter));
        assert_eq!(map.get(&Position::new(7, 1)), None);
        assert_eq!(map.get(&Position::new(-1, 1)), None);
    }

    #[test]
    fn test_stations_are_indexed() {
        let map = grid(FULL_DIVIDER);
        assert_eq!(map.stations().len(), 3);
        assert_eq!(map.positions_of(CellKind::CuttingStation).len(), 2);
        assert_eq!(
            map.station_at(&Position::new(0, 3)).map(|item| item.name()),
            Some("DeliveryStation")
        );
        assert!(map.station_at(&Position::new(1, 1)).is_none());
    }

    #[test]
    fn test_display_matches_source_layout() {
        let map = grid(FULL_DIVIDER);
        assert_eq!(map.to_string(), FULL_DIVIDER);
    }
}
