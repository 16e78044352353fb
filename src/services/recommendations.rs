use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::likes::LikeIndex;
use crate::{
    db::{FilmStore, UserStore},
    error::{AppError, AppResult},
    models::{Film, FilmId, Like, UserId},
};

/// Counts, for every other user, how many of `taste` they also liked
///
/// `likes` is expected to hold the likes placed on the films in `taste`.
pub fn taste_overlap(
    user_id: UserId,
    taste: &BTreeSet<FilmId>,
    likes: &[Like],
) -> HashMap<UserId, usize> {
    let mut overlap = HashMap::new();
    for like in likes {
        if like.user_id != user_id && taste.contains(&like.film_id) {
            *overlap.entry(like.user_id).or_insert(0) += 1;
        }
    }
    overlap
}

/// Users sharing the largest non-zero overlap; all of them when several tie
pub fn most_similar_users(overlap: &HashMap<UserId, usize>) -> BTreeSet<UserId> {
    let best = overlap.values().copied().max().unwrap_or(0);
    if best == 0 {
        return BTreeSet::new();
    }

    overlap
        .iter()
        .filter(|(_, count)| **count == best)
        .map(|(user, _)| *user)
        .collect()
}

/// Films the similar users liked and `taste` lacks, ranked by how many of
/// those users liked each one, then by ascending id
pub fn rank_candidates(
    taste: &BTreeSet<FilmId>,
    similar_likes: &[BTreeSet<FilmId>],
) -> Vec<(FilmId, usize)> {
    let mut votes: HashMap<FilmId, usize> = HashMap::new();
    for films in similar_likes {
        for film in films.difference(taste) {
            *votes.entry(*film).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(FilmId, usize)> = votes.into_iter().collect();
    ranked.sort_by_key(|(film, votes)| (Reverse(*votes), *film));
    ranked
}

/// Generates personalized film recommendations
///
/// User-based collaborative filtering over the like index: find the users
/// whose likes overlap most with the target's, then suggest what they liked
/// and the target has not.
#[derive(Clone)]
pub struct RecommendationEngine {
    likes: LikeIndex,
    films: Arc<dyn FilmStore>,
    users: Arc<dyn UserStore>,
}

impl RecommendationEngine {
    pub fn new(likes: LikeIndex, films: Arc<dyn FilmStore>, users: Arc<dyn UserStore>) -> Self {
        Self {
            likes,
            films,
            users,
        }
    }

    /// Ranked film ids recommended to `user_id`
    pub async fn recommended_ids(&self, user_id: UserId) -> AppResult<Vec<(FilmId, usize)>> {
        if !self.users.exists(user_id).await? {
            return Err(AppError::UserNotFound(user_id));
        }

        let taste = self.likes.films_liked_by(user_id).await?;
        if taste.is_empty() {
            tracing::debug!(user_id = %user_id, "No likes yet, nothing to recommend");
            return Ok(Vec::new());
        }

        let taste_ids: Vec<FilmId> = taste.iter().copied().collect();
        let likes = self.likes.likes_on(&taste_ids).await?;
        let overlap = taste_overlap(user_id, &taste, &likes);
        let similar = most_similar_users(&overlap);

        if similar.is_empty() {
            tracing::debug!(user_id = %user_id, "No users with overlapping taste");
            return Ok(Vec::new());
        }

        let mut similar_likes = Vec::with_capacity(similar.len());
        for other in &similar {
            similar_likes.push(self.likes.films_liked_by(*other).await?);
        }

        let ranked = rank_candidates(&taste, &similar_likes);

        tracing::info!(
            user_id = %user_id,
            similar_users = similar.len(),
            candidates = ranked.len(),
            "Computed recommendations"
        );

        Ok(ranked)
    }

    /// Recommended films for `user_id`, best first, optionally capped at `limit`
    pub async fn recommend(&self, user_id: UserId, limit: Option<usize>) -> AppResult<Vec<Film>> {
        let mut ranked = self.recommended_ids(user_id).await?;
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }

        let ids: Vec<FilmId> = ranked.iter().map(|(film, _)| *film).collect();
        let mut films: HashMap<FilmId, Film> = self
            .films
            .by_ids(&ids)
            .await?
            .into_iter()
            .map(|film| (film.id, film))
            .collect();

        Ok(ids.iter().filter_map(|id| films.remove(id)).collect())
    }
}
