use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::store::{FilmStore, FriendStore, LikeStore, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        DirectorId, Film, FilmId, FriendPair, Friendship, GenreId, Like, MpaId, NewFilm, NewUser,
        User, UserId,
    },
};

/// Reference rows seeded by the initial migration
const MPA_RATINGS: [(i32, &str); 5] = [(1, "G"), (2, "PG"), (3, "PG-13"), (4, "R"), (5, "NC-17")];

const GENRES: [(i32, &str); 6] = [
    (1, "Comedy"),
    (2, "Drama"),
    (3, "Animation"),
    (4, "Thriller"),
    (5, "Documentary"),
    (6, "Action"),
];

/// In-process store backed by ordered maps
///
/// Every trait method takes the lock exactly once, so two racing calls on the
/// same like or friendship pair observe each other's effects in some order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub inner: Arc<RwLock<MemoryStoreInner>>,
}

pub struct MemoryStoreInner {
    pub users: BTreeMap<UserId, User>,
    pub films: BTreeMap<FilmId, Film>,
    pub likes: BTreeSet<Like>,
    pub friendships: BTreeMap<FriendPair, Friendship>,
    genres: BTreeMap<GenreId, String>,
    mpa: BTreeMap<MpaId, String>,
    /// No endpoint creates directors, so this starts and stays empty
    directors: BTreeMap<DirectorId, String>,
    last_user_id: i64,
    last_film_id: i64,
}

impl Default for MemoryStoreInner {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            films: BTreeMap::new(),
            likes: BTreeSet::new(),
            friendships: BTreeMap::new(),
            genres: GENRES
                .iter()
                .map(|(id, name)| (GenreId(*id), name.to_string()))
                .collect(),
            mpa: MPA_RATINGS
                .iter()
                .map(|(id, name)| (MpaId(*id), name.to_string()))
                .collect(),
            directors: BTreeMap::new(),
            last_user_id: 0,
            last_film_id: 0,
        }
    }
}

impl MemoryStoreInner {
    /// Fills in reference names and rejects ids the catalogue does not know,
    /// the same way the Postgres foreign keys do
    fn resolve_references(&self, film: &mut Film) -> AppResult<()> {
        if let Some(mpa) = film.mpa.as_mut() {
            mpa.name = reference_name(&self.mpa, mpa.id, "mpa rating")?;
        }
        for genre in film.genres.iter_mut() {
            genre.name = reference_name(&self.genres, genre.id, "genre")?;
        }
        for director in film.directors.iter_mut() {
            director.name = reference_name(&self.directors, director.id, "director")?;
        }
        Ok(())
    }
}

fn reference_name<K: Ord>(names: &BTreeMap<K, String>, id: K, what: &str) -> AppResult<String> {
    names
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::InvalidInput(format!("unknown {} referenced", what)))
}

impl MemoryStore {
    /// Creates a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        let user = user.into_user(UserId(inner.last_user_id + 1))?;
        inner.last_user_id += 1;
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> AppResult<User> {
        let inner = self.inner.read().await;
        inner.users.get(&id).cloned().ok_or(AppError::UserNotFound(id))
    }

    async fn exists(&self, id: UserId) -> AppResult<bool> {
        Ok(self.inner.read().await.users.contains_key(&id))
    }

    async fn by_ids(&self, ids: &[UserId]) -> AppResult<Vec<User>> {
        let wanted: BTreeSet<UserId> = ids.iter().copied().collect();
        let inner = self.inner.read().await;
        Ok(wanted
            .into_iter()
            .filter_map(|id| inner.users.get(&id).cloned())
            .collect())
    }
}

#[async_trait::async_trait]
impl FilmStore for MemoryStore {
    async fn create(&self, film: NewFilm) -> AppResult<Film> {
        let mut inner = self.inner.write().await;
        let mut film = film.into_film(FilmId(inner.last_film_id + 1))?;
        inner.resolve_references(&mut film)?;
        inner.last_film_id += 1;
        inner.films.insert(film.id, film.clone());
        Ok(film)
    }

    async fn get(&self, id: FilmId) -> AppResult<Film> {
        let inner = self.inner.read().await;
        inner.films.get(&id).cloned().ok_or(AppError::FilmNotFound(id))
    }

    async fn exists(&self, id: FilmId) -> AppResult<bool> {
        Ok(self.inner.read().await.films.contains_key(&id))
    }

    async fn all(&self) -> AppResult<Vec<Film>> {
        Ok(self.inner.read().await.films.values().cloned().collect())
    }

    async fn by_ids(&self, ids: &[FilmId]) -> AppResult<Vec<Film>> {
        let wanted: BTreeSet<FilmId> = ids.iter().copied().collect();
        let inner = self.inner.read().await;
        Ok(wanted
            .into_iter()
            .filter_map(|id| inner.films.get(&id).cloned())
            .collect())
    }
}

#[async_trait::async_trait]
impl LikeStore for MemoryStore {
    async fn insert(&self, like: Like) -> AppResult<bool> {
        Ok(self.inner.write().await.likes.insert(like))
    }

    async fn delete(&self, like: Like) -> AppResult<bool> {
        Ok(self.inner.write().await.likes.remove(&like))
    }

    async fn exists(&self, like: Like) -> AppResult<bool> {
        Ok(self.inner.read().await.likes.contains(&like))
    }

    async fn users_for_film(&self, film_id: FilmId) -> AppResult<Vec<UserId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .likes
            .iter()
            .filter(|like| like.film_id == film_id)
            .map(|like| like.user_id)
            .collect())
    }

    async fn films_for_user(&self, user_id: UserId) -> AppResult<Vec<FilmId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .likes
            .iter()
            .filter(|like| like.user_id == user_id)
            .map(|like| like.film_id)
            .collect())
    }

    async fn likes_for_films(&self, film_ids: &[FilmId]) -> AppResult<Vec<Like>> {
        let wanted: BTreeSet<FilmId> = film_ids.iter().copied().collect();
        let inner = self.inner.read().await;
        Ok(inner
            .likes
            .iter()
            .filter(|like| wanted.contains(&like.film_id))
            .copied()
            .collect())
    }

    async fn counts_for_films(&self, film_ids: &[FilmId]) -> AppResult<HashMap<FilmId, u64>> {
        let wanted: BTreeSet<FilmId> = film_ids.iter().copied().collect();
        let inner = self.inner.read().await;
        let mut counts = HashMap::new();
        for like in inner.likes.iter().filter(|like| wanted.contains(&like.film_id)) {
            *counts.entry(like.film_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[async_trait::async_trait]
impl FriendStore for MemoryStore {
    async fn insert(&self, edge: Friendship) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.friendships.contains_key(&edge.pair) {
            return Ok(false);
        }
        inner.friendships.insert(edge.pair, edge);
        Ok(true)
    }

    async fn find(&self, pair: FriendPair) -> AppResult<Option<Friendship>> {
        Ok(self.inner.read().await.friendships.get(&pair).copied())
    }

    async fn mark_confirmed(&self, pair: FriendPair, requester: UserId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.friendships.get_mut(&pair) {
            Some(edge) if edge.requester == requester => {
                edge.confirmed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, pair: FriendPair) -> AppResult<bool> {
        Ok(self.inner.write().await.friendships.remove(&pair).is_some())
    }

    async fn edges_for(&self, user_id: UserId) -> AppResult<Vec<Friendship>> {
        let inner = self.inner.read().await;
        Ok(inner
            .friendships
            .values()
            .filter(|edge| edge.pair.contains(user_id))
            .copied()
            .collect())
    }
}
