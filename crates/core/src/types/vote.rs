use serde::Serialize;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDelta {
    Up,
    Down,
}

impl VoteDelta {
    pub fn value(self) -> i64 {
        match self {
            VoteDelta::Up => 1,
            VoteDelta::Down => -1,
        }
    }

    pub fn apply(self, votes: i64) -> i64 {
        votes.saturating_add(self.value())
    }
}

impl TryFrom<i64> for VoteDelta {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteDelta::Up),
            -1 => Ok(VoteDelta::Down),
            other => Err(CoreError::InvalidVote(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::VoteDelta;

    #[test]
    fn accepts_unit_deltas_only() {
        assert_eq!(VoteDelta::try_from(1).unwrap(), VoteDelta::Up);
        assert_eq!(VoteDelta::try_from(-1).unwrap(), VoteDelta::Down);
        assert!(VoteDelta::try_from(0).is_err());
        assert!(VoteDelta::try_from(2).is_err());
    }

    #[test]
    fn apply_allows_negative_totals() {
        assert_eq!(VoteDelta::Down.apply(0), -1);
        assert_eq!(VoteDelta::Up.apply(i64::MAX), i64::MAX);
    }
}
