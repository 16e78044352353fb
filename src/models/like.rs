use serde::{Deserialize, Serialize};

use super::{FilmId, UserId};

/// Fact that a user liked a film. At most one exists per pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct Like {
    pub film_id: FilmId,
    pub user_id: UserId,
}

impl Like {
    pub fn new(film_id: FilmId, user_id: UserId) -> Self {
        Self { film_id, user_id }
    }
}
