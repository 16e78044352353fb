/// Storage contracts consumed by the graph and ranking services
///
/// The services hold no state of their own: every read and mutation goes
/// through one of these traits, so the implementation behind them is the only
/// place where concurrent calls on the same pair are serialized.
use std::collections::HashMap;

use crate::{
    error::AppResult,
    models::{Film, FilmId, FriendPair, Friendship, Like, NewFilm, NewUser, User, UserId},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> AppResult<User>;

    /// Fails with `UserNotFound` when the id is unknown
    async fn get(&self, id: UserId) -> AppResult<User>;

    async fn exists(&self, id: UserId) -> AppResult<bool>;

    /// Returns the known users among `ids`, ordered by ascending id
    async fn by_ids(&self, ids: &[UserId]) -> AppResult<Vec<User>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FilmStore: Send + Sync {
    /// Assigns the id and fills in reference names; fails with `InvalidInput`
    /// when the mpa rating, a genre or a director is unknown
    async fn create(&self, film: NewFilm) -> AppResult<Film>;

    /// Fails with `FilmNotFound` when the id is unknown
    async fn get(&self, id: FilmId) -> AppResult<Film>;

    async fn exists(&self, id: FilmId) -> AppResult<bool>;

    async fn all(&self) -> AppResult<Vec<Film>>;

    /// Returns the known films among `ids`, ordered by ascending id
    async fn by_ids(&self, ids: &[FilmId]) -> AppResult<Vec<Film>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LikeStore: Send + Sync {
    /// Stores the like; returns false when it was already present
    async fn insert(&self, like: Like) -> AppResult<bool>;

    /// Removes the like; returns false when there was nothing to remove
    async fn delete(&self, like: Like) -> AppResult<bool>;

    async fn exists(&self, like: Like) -> AppResult<bool>;

    async fn users_for_film(&self, film_id: FilmId) -> AppResult<Vec<UserId>>;

    async fn films_for_user(&self, user_id: UserId) -> AppResult<Vec<FilmId>>;

    /// Every like on any of `film_ids`
    async fn likes_for_films(&self, film_ids: &[FilmId]) -> AppResult<Vec<Like>>;

    /// Number of distinct likers per film; films without likes may be absent
    async fn counts_for_films(&self, film_ids: &[FilmId]) -> AppResult<HashMap<FilmId, u64>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FriendStore: Send + Sync {
    /// Stores the row; returns false when the pair already has one
    async fn insert(&self, edge: Friendship) -> AppResult<bool>;

    async fn find(&self, pair: FriendPair) -> AppResult<Option<Friendship>>;

    /// Sets the confirmation flag on the pair's row if `requester` sent it;
    /// returns false when no such row exists
    async fn mark_confirmed(&self, pair: FriendPair, requester: UserId) -> AppResult<bool>;

    /// Removes the row; returns false when the pair has none
    async fn delete(&self, pair: FriendPair) -> AppResult<bool>;

    /// Every row, confirmed or not, that `user_id` is a member of
    async fn edges_for(&self, user_id: UserId) -> AppResult<Vec<Friendship>>;
}
