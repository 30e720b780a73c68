#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Path of child indices ("moves") from the root of an execution tree.
///
/// The empty path is the root. Positions are the only key used to persist
/// task state, so two tasks share state iff their positions are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Position {
    moves: Vec<usize>,
}

impl Position {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_moves(moves: impl Into<Vec<usize>>) -> Self {
        Self {
            moves: moves.into(),
        }
    }

    pub fn moves(&self) -> &[usize] {
        &self.moves
    }

    pub fn is_root(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.moves.len()
    }

    pub fn add_move(&mut self, index: usize) {
        self.moves.push(index);
    }

    /// Position of the child reached by `index` from here.
    pub fn child(&self, index: usize) -> Self {
        let mut moves = Vec::with_capacity(self.moves.len() + 1);
        moves.extend_from_slice(&self.moves);
        moves.push(index);
        Self { moves }
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.moves.split_last()?;
        Some(Self {
            moves: rest.to_vec(),
        })
    }

    /// Deterministic 64-bit digest, used to derive per-task RNG seeds.
    pub fn digest(&self) -> u64 {
        self.moves.iter().fold(0xCBF2_9CE4_8422_2325u64, |acc, m| {
            crate::rng::mix64(acc ^ (*m as u64).wrapping_add(0x9E37_79B9_7F4A_7C15))
        })
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (i, m) in self.moves.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{m}")?;
        }
        f.write_str("]")
    }
}

impl From<Vec<usize>> for Position {
    fn from(moves: Vec<usize>) -> Self {
        Self { moves }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_and_parent_are_inverse() {
        let p = Position::root().child(2).child(0);
        assert_eq!(p.moves(), &[2, 0]);
        assert_eq!(p.parent(), Some(Position::from_moves(vec![2])));
        assert_eq!(Position::root().parent(), None);
    }

    #[test]
    fn display_lists_moves() {
        assert_eq!(Position::root().to_string(), "[]");
        assert_eq!(Position::from_moves(vec![1, 3]).to_string(), "[1, 3]");
    }

    #[test]
    fn digest_distinguishes_sibling_positions() {
        let a = Position::from_moves(vec![0, 1]);
        let b = Position::from_moves(vec![1, 0]);
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest(), Position::from_moves(vec![0, 1]).digest());
    }
}
