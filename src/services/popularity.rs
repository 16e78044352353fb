use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use super::likes::LikeIndex;
use crate::{
    db::FilmStore,
    error::AppResult,
    models::{Film, FilmId, GenreId},
};

/// Parameters of a popular-films query. Filters combine with AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopularQuery {
    pub count: usize,
    pub genre_id: Option<GenreId>,
    pub year: Option<i32>,
}

impl PopularQuery {
    pub fn top(count: usize) -> Self {
        Self {
            count,
            genre_id: None,
            year: None,
        }
    }

    pub fn with_genre(mut self, genre_id: GenreId) -> Self {
        self.genre_id = Some(genre_id);
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Whether the film passes every supplied filter
    pub fn matches(&self, film: &Film) -> bool {
        let year_ok = self.year.map_or(true, |year| film.release_year() == year);
        let genre_ok = self.genre_id.map_or(true, |genre| film.genre_ids().contains(&genre));
        year_ok && genre_ok
    }
}

/// Orders films by like count, most liked first, and keeps the first `count`.
///
/// Films with equal counts are ordered by ascending id.
pub fn rank_by_popularity(
    mut films: Vec<Film>,
    counts: &HashMap<FilmId, u64>,
    count: usize,
) -> Vec<Film> {
    films.sort_by_key(|film| (Reverse(counts.get(&film.id).copied().unwrap_or(0)), film.id));
    films.truncate(count);
    films
}

/// Ranks the catalogue, or a filtered part of it, by popularity
#[derive(Clone)]
pub struct PopularityRanker {
    films: Arc<dyn FilmStore>,
    likes: LikeIndex,
}

impl PopularityRanker {
    pub fn new(films: Arc<dyn FilmStore>, likes: LikeIndex) -> Self {
        Self { films, likes }
    }

    pub async fn popular(&self, query: PopularQuery) -> AppResult<Vec<Film>> {
        let candidates: Vec<Film> = self
            .films
            .all()
            .await?
            .into_iter()
            .filter(|film| query.matches(film))
            .collect();

        let film_ids: Vec<FilmId> = candidates.iter().map(|film| film.id).collect();
        let counts = self.likes.popularity_of(&film_ids).await?;

        tracing::debug!(
            candidates = candidates.len(),
            count = query.count,
            genre_id = ?query.genre_id,
            year = ?query.year,
            "Ranking films by popularity"
        );

        Ok(rank_by_popularity(candidates, &counts, query.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;
    use crate::services::test_support::{add_film, seeded_store, TestStore};

    fn ranker(store: &TestStore) -> (PopularityRanker, LikeIndex) {
        let likes = LikeIndex::new(store.likes(), store.films(), store.users());
        (PopularityRanker::new(store.films(), likes.clone()), likes)
    }

    fn ids(films: &[Film]) -> Vec<FilmId> {
        films.iter().map(|f| f.id).collect()
    }

    #[tokio::test]
    async fn test_ties_broken_by_ascending_id() {
        let store = seeded_store(3, 3).await;
        let (ranker, likes) = ranker(&store);

        // F2 and F1 both get three likes, F3 gets one
        for user in 1..=3 {
            likes.like(FilmId(2), UserId(user)).await.unwrap();
            likes.like(FilmId(1), UserId(user)).await.unwrap();
        }
        likes.like(FilmId(3), UserId(1)).await.unwrap();

        let top = ranker.popular(PopularQuery::top(2)).await.unwrap();
        assert_eq!(ids(&top), vec![FilmId(1), FilmId(2)]);
    }

    #[tokio::test]
    async fn test_unliked_films_still_ranked() {
        let store = seeded_store(2, 4).await;
        let (ranker, likes) = ranker(&store);

        likes.like(FilmId(4), UserId(1)).await.unwrap();

        let top = ranker.popular(PopularQuery::top(10)).await.unwrap();
        assert_eq!(ids(&top), vec![FilmId(4), FilmId(1), FilmId(2), FilmId(3)]);
    }

    #[tokio::test]
    async fn test_filters_combine_with_and() {
        let store = seeded_store(3, 0).await;
        let (ranker, likes) = ranker(&store);

        let drama_2001 = add_film(&store, 2001, &[2]).await;
        let comedy_2001 = add_film(&store, 2001, &[1]).await;
        let drama_1999 = add_film(&store, 1999, &[2, 1]).await;
        let drama_2001_b = add_film(&store, 2001, &[1, 2]).await;

        likes.like(drama_1999, UserId(1)).await.unwrap();
        likes.like(drama_1999, UserId(2)).await.unwrap();
        likes.like(drama_2001_b, UserId(3)).await.unwrap();

        let by_genre = ranker
            .popular(PopularQuery::top(10).with_genre(GenreId(2)))
            .await
            .unwrap();
        assert_eq!(ids(&by_genre), vec![drama_1999, drama_2001_b, drama_2001]);

        let by_year = ranker
            .popular(PopularQuery::top(10).with_year(2001))
            .await
            .unwrap();
        assert_eq!(ids(&by_year), vec![drama_2001_b, drama_2001, comedy_2001]);

        let both = ranker
            .popular(PopularQuery::top(10).with_genre(GenreId(2)).with_year(2001))
            .await
            .unwrap();
        assert_eq!(ids(&both), vec![drama_2001_b, drama_2001]);

        let none = ranker
            .popular(PopularQuery::top(10).with_genre(GenreId(6)))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_rank_by_popularity_truncates() {
        let films: Vec<Film> = Vec::new();
        assert!(rank_by_popularity(films, &HashMap::new(), 3).is_empty());
    }
}
