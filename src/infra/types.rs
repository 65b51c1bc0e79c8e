use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn neighbors(&self) -> [Position; 4] {
        [
            Position::new(self.x, self.y - 1), // North
            Position::new(self.x + 1, self.y), // East
            Position::new(self.x, self.y + 1), // South
            Position::new(self.x - 1, self.y), // West
        ]
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, other: Position) -> Position {
        Position::new(self.x + other.x, self.y + other.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Position::new(x, y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub usize);

impl AgentId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single-tick move. Moving into an occupied cell interacts with it
/// instead (pickup, drop, merge); the agent stays put in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    NoOp,
    MoveRight,
    MoveUp,
    MoveLeft,
    MoveDown,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::NoOp,
        Action::MoveRight,
        Action::MoveUp,
        Action::MoveLeft,
        Action::MoveDown,
    ];

    pub fn direction(self) -> Position {
        match self {
            Action::NoOp => Position::new(0, 0),
            Action::MoveRight => Position::new(1, 0),
            Action::MoveUp => Position::new(0, -1),
            Action::MoveLeft => Position::new(-1, 0),
            Action::MoveDown => Position::new(0, 1),
        }
    }

    pub fn from_direction(dx: i32, dy: i32) -> Option<Action> {
        Action::ALL
            .into_iter()
            .find(|action| action.direction() == Position::new(dx, dy))
    }

    pub fn is_noop(self) -> bool {
        self == Action::NoOp
    }
}

/// One action per agent, applied atomically for a single tick.
pub type JointAction = BTreeMap<AgentId, Action>;

/// Unordered pair of agents involved in a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentPair {
    pub first: AgentId,
    pub second: AgentId,
}

impl AgentPair {
    pub fn new(a: AgentId, b: AgentId) -> Self {
        Self {
            first: a.min(b),
            second: a.max(b),
        }
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.first == agent || self.second == agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_direction_roundtrip() {
        for action in Action::ALL {
            let dir = action.direction();
            assert_eq!(
                Action::from_direction(dir.x, dir.y),
                Some(action),
                "direction of {:?} should map back to it",
                action
            );
        }
        assert_eq!(Action::from_direction(1, 1), None);
    }

    #[test]
    fn test_position_add_applies_direction() {
        let pos = Position::new(2, 3);
        assert_eq!(pos + Action::MoveUp.direction(), Position::new(2, 2));
        assert_eq!(pos + Action::MoveRight.direction(), Position::new(3, 3));
        assert_eq!(pos + Action::NoOp.direction(), pos);
    }

    #[test]
    fn test_neighbors_are_one_step_away() {
        let pos = Position::new(2, 3);
        let neighbors = pos.neighbors();

        assert!(neighbors.iter().all(|n| pos.distance(n) == 1));
        for action in Action::ALL.into_iter().filter(|a| !a.is_noop()) {
            assert!(neighbors.contains(&(pos + action.direction())), "{:?}", action);
        }
    }

    #[test]
    fn test_agent_pair_is_unordered() {
        let a = AgentId(0);
        let b = AgentId(1);
        assert_eq!(AgentPair::new(a, b), AgentPair::new(b, a));
        assert!(AgentPair::new(a, b).contains(b));
    }
}
