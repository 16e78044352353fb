use serde::{Deserialize, Serialize};

use super::UserId;
use crate::error::{AppError, AppResult};

/// Unordered pair of distinct users, stored with the smaller id first.
///
/// `FriendPair::new(a, b)` and `FriendPair::new(b, a)` are equal, so a pair is
/// the only key friendship rows are looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FriendPair {
    low: UserId,
    high: UserId,
}

impl FriendPair {
    pub fn new(a: UserId, b: UserId) -> AppResult<Self> {
        if a == b {
            return Err(AppError::InvalidInput(format!(
                "user {} cannot befriend themselves",
                a
            )));
        }

        Ok(Self {
            low: a.min(b),
            high: a.max(b),
        })
    }

    pub fn low(&self) -> UserId {
        self.low
    }

    pub fn high(&self) -> UserId {
        self.high
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.low == user || self.high == user
    }

    /// Returns the member of the pair that is not `user`
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if user == self.low {
            Some(self.high)
        } else if user == self.high {
            Some(self.low)
        } else {
            None
        }
    }
}

/// One friendship row: the pair, who asked first, and whether the other side accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub pair: FriendPair,
    pub requester: UserId,
    pub confirmed: bool,
}

impl Friendship {
    /// A fresh, unconfirmed request from `requester` to `target`
    pub fn request(requester: UserId, target: UserId) -> AppResult<Self> {
        Ok(Self {
            pair: FriendPair::new(requester, target)?,
            requester,
            confirmed: false,
        })
    }

    /// The user the request was sent to
    pub fn target(&self) -> UserId {
        // requester is always a member of the pair
        self.pair.other(self.requester).unwrap_or(self.requester)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_unordered() {
        let ab = FriendPair::new(UserId(1), UserId(2)).unwrap();
        let ba = FriendPair::new(UserId(2), UserId(1)).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.low(), UserId(1));
        assert_eq!(ab.high(), UserId(2));
    }

    #[test]
    fn test_self_pair_rejected() {
        let result = FriendPair::new(UserId(3), UserId(3));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_other_member() {
        let pair = FriendPair::new(UserId(8), UserId(5)).unwrap();
        assert_eq!(pair.other(UserId(8)), Some(UserId(5)));
        assert_eq!(pair.other(UserId(5)), Some(UserId(8)));
        assert_eq!(pair.other(UserId(6)), None);
        assert!(pair.contains(UserId(5)));
    }

    #[test]
    fn test_request_keeps_direction() {
        let edge = Friendship::request(UserId(9), UserId(2)).unwrap();
        assert_eq!(edge.requester, UserId(9));
        assert_eq!(edge.target(), UserId(2));
        assert_eq!(edge.pair.low(), UserId(2));
        assert!(!edge.confirmed);
    }
}
