use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::{
    db::{FilmStore, LikeStore, UserStore},
    error::{AppError, AppResult},
    models::{FilmId, Like, UserId},
};

/// Bipartite user/film relation behind popularity and recommendations
///
/// Holds no state: every call reads or writes the like store, and popularity is
/// always counted from the live set of likes.
#[derive(Clone)]
pub struct LikeIndex {
    likes: Arc<dyn LikeStore>,
    films: Arc<dyn FilmStore>,
    users: Arc<dyn UserStore>,
}

impl LikeIndex {
    pub fn new(
        likes: Arc<dyn LikeStore>,
        films: Arc<dyn FilmStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            likes,
            films,
            users,
        }
    }

    async fn ensure_participants(&self, like: Like) -> AppResult<()> {
        if !self.films.exists(like.film_id).await? {
            return Err(AppError::FilmNotFound(like.film_id));
        }
        if !self.users.exists(like.user_id).await? {
            return Err(AppError::UserNotFound(like.user_id));
        }
        Ok(())
    }

    /// Records that `user_id` likes `film_id`. Liking twice is a no-op.
    pub async fn like(&self, film_id: FilmId, user_id: UserId) -> AppResult<()> {
        let like = Like::new(film_id, user_id);
        self.ensure_participants(like).await?;

        let inserted = self.likes.insert(like).await?;
        tracing::info!(
            film_id = %film_id,
            user_id = %user_id,
            inserted,
            "Like recorded"
        );

        Ok(())
    }

    /// Removes a like; fails with `LikeNotFound` when the pair was never liked
    pub async fn unlike(&self, film_id: FilmId, user_id: UserId) -> AppResult<()> {
        let like = Like::new(film_id, user_id);
        self.ensure_participants(like).await?;

        if !self.likes.delete(like).await? {
            return Err(AppError::LikeNotFound { film_id, user_id });
        }

        tracing::info!(film_id = %film_id, user_id = %user_id, "Like removed");

        Ok(())
    }

    pub async fn users_who_liked(&self, film_id: FilmId) -> AppResult<BTreeSet<UserId>> {
        Ok(self.likes.users_for_film(film_id).await?.into_iter().collect())
    }

    pub async fn films_liked_by(&self, user_id: UserId) -> AppResult<BTreeSet<FilmId>> {
        Ok(self.likes.films_for_user(user_id).await?.into_iter().collect())
    }

    /// Every like placed on any of `film_ids`
    pub async fn likes_on(&self, film_ids: &[FilmId]) -> AppResult<Vec<Like>> {
        self.likes.likes_for_films(film_ids).await
    }

    /// Number of distinct users who liked the film
    pub async fn popularity(&self, film_id: FilmId) -> AppResult<u64> {
        Ok(self.users_who_liked(film_id).await?.len() as u64)
    }

    /// Popularity of several films at once; films nobody liked map to zero
    pub async fn popularity_of(&self, film_ids: &[FilmId]) -> AppResult<HashMap<FilmId, u64>> {
        let counts = self.likes.counts_for_films(film_ids).await?;
        Ok(film_ids
            .iter()
            .map(|id| (*id, counts.get(id).copied().unwrap_or(0)))
            .collect())
    }
}
