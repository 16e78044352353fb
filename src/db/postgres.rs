use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::store::{FilmStore, FriendStore, LikeStore, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        Director, DirectorId, Film, FilmId, FriendPair, Friendship, Genre, GenreId, Like, Mpa,
        MpaId, NewFilm, NewUser, User, UserId,
    },
};

const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the schema in `migrations/`
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Store implementation on top of a Postgres pool
///
/// Uniqueness of likes and friendship pairs is enforced by primary keys, so
/// racing inserts or deletes on the same pair are settled by the database.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct FilmRow {
    id: FilmId,
    name: String,
    description: String,
    release_date: NaiveDate,
    duration: i32,
    mpa_id: Option<MpaId>,
    mpa_name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct FilmGenreRow {
    film_id: FilmId,
    id: GenreId,
    name: String,
}

#[derive(sqlx::FromRow)]
struct FilmDirectorRow {
    film_id: FilmId,
    id: DirectorId,
    name: String,
}

#[derive(sqlx::FromRow)]
struct FriendshipRow {
    user_low: UserId,
    user_high: UserId,
    requester: UserId,
    confirmed: bool,
}

impl FriendshipRow {
    fn into_friendship(self) -> AppResult<Friendship> {
        let pair = FriendPair::new(self.user_low, self.user_high).map_err(|_| {
            AppError::Internal(format!("corrupt friendship row for user {}", self.user_low))
        })?;
        Ok(Friendship {
            pair,
            requester: self.requester,
            confirmed: self.confirmed,
        })
    }
}

/// Turns a foreign key failure into a client error naming the payload field
fn map_reference_error(e: sqlx::Error, what: &str) -> AppError {
    let is_fk_violation = e
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == FOREIGN_KEY_VIOLATION)
        .unwrap_or(false);

    if is_fk_violation {
        AppError::InvalidInput(format!("unknown {} referenced", what))
    } else {
        AppError::Database(e)
    }
}

fn raw_ids<T, F: Fn(&T) -> i64>(ids: &[T], f: F) -> Vec<i64> {
    ids.iter().map(f).collect()
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads films with their genres and directors; `None` loads the whole catalogue
    async fn load_films(&self, ids: Option<Vec<i64>>) -> AppResult<Vec<Film>> {
        let rows: Vec<FilmRow> = sqlx::query_as(
            r#"
            SELECT f.id, f.name, f.description, f.release_date, f.duration,
                   f.mpa_id, m.name AS mpa_name
            FROM films f
            LEFT JOIN mpa m ON m.id = f.mpa_id
            WHERE $1::BIGINT[] IS NULL OR f.id = ANY($1)
            ORDER BY f.id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let film_ids: Vec<i64> = rows.iter().map(|row| row.id.0).collect();

        let genre_rows: Vec<FilmGenreRow> = sqlx::query_as(
            r#"
            SELECT fg.film_id, g.id, g.name
            FROM film_genres fg
            JOIN genres g ON g.id = fg.genre_id
            WHERE fg.film_id = ANY($1)
            ORDER BY fg.film_id, g.id
            "#,
        )
        .bind(&film_ids)
        .fetch_all(&self.pool)
        .await?;

        let director_rows: Vec<FilmDirectorRow> = sqlx::query_as(
            r#"
            SELECT fd.film_id, d.id, d.name
            FROM film_directors fd
            JOIN directors d ON d.id = fd.director_id
            WHERE fd.film_id = ANY($1)
            ORDER BY fd.film_id, d.id
            "#,
        )
        .bind(&film_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut genres: HashMap<FilmId, Vec<Genre>> = HashMap::new();
        for row in genre_rows {
            genres.entry(row.film_id).or_default().push(Genre {
                id: row.id,
                name: row.name,
            });
        }

        let mut directors: HashMap<FilmId, Vec<Director>> = HashMap::new();
        for row in director_rows {
            directors.entry(row.film_id).or_default().push(Director {
                id: row.id,
                name: row.name,
            });
        }

        let films = rows
            .into_iter()
            .map(|row| Film {
                id: row.id,
                name: row.name,
                description: row.description,
                release_date: row.release_date,
                duration: row.duration,
                mpa: row.mpa_id.map(|id| Mpa {
                    id,
                    name: row.mpa_name.unwrap_or_default(),
                }),
                genres: genres.remove(&row.id).unwrap_or_default(),
                directors: directors.remove(&row.id).unwrap_or_default(),
            })
            .collect();

        Ok(films)
    }
}

#[async_trait::async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let name = user.validate()?;

        let created: User = sqlx::query_as(
            r#"
            INSERT INTO users (email, login, name, birthday)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, login, name, birthday
            "#,
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&name)
        .bind(user.birthday)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %created.id, login = %created.login, "User created");

        Ok(created)
    }

    async fn get(&self, id: UserId) -> AppResult<User> {
        sqlx::query_as("SELECT id, email, login, name, birthday FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::UserNotFound(id))
    }

    async fn exists(&self, id: UserId) -> AppResult<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn by_ids(&self, ids: &[UserId]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as(
            r#"
            SELECT id, email, login, name, birthday
            FROM users
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(raw_ids(ids, |id| id.0))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}

#[async_trait::async_trait]
impl FilmStore for PgStore {
    async fn create(&self, film: NewFilm) -> AppResult<Film> {
        // Normalizes genres and directors; the id is assigned by the insert below
        let film = film.into_film(FilmId(0))?;

        let mut tx = self.pool.begin().await?;

        let id: FilmId = sqlx::query_scalar(
            r#"
            INSERT INTO films (name, description, release_date, duration, mpa_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.mpa.as_ref().map(|mpa| mpa.id))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_reference_error(e, "mpa rating"))?;

        for genre in &film.genres {
            sqlx::query("INSERT INTO film_genres (film_id, genre_id) VALUES ($1, $2)")
                .bind(id)
                .bind(genre.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_reference_error(e, "genre"))?;
        }

        for director in &film.directors {
            sqlx::query("INSERT INTO film_directors (film_id, director_id) VALUES ($1, $2)")
                .bind(id)
                .bind(director.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_reference_error(e, "director"))?;
        }

        tx.commit().await?;

        tracing::info!(film_id = %id, name = %film.name, "Film created");

        FilmStore::get(self, id).await
    }

    async fn get(&self, id: FilmId) -> AppResult<Film> {
        self.load_films(Some(vec![id.0]))
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::FilmNotFound(id))
    }

    async fn exists(&self, id: FilmId) -> AppResult<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM films WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn all(&self) -> AppResult<Vec<Film>> {
        self.load_films(None).await
    }

    async fn by_ids(&self, ids: &[FilmId]) -> AppResult<Vec<Film>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.load_films(Some(raw_ids(ids, |id| id.0))).await
    }
}

#[async_trait::async_trait]
impl LikeStore for PgStore {
    async fn insert(&self, like: Like) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO likes (film_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(like.film_id)
        .bind(like.user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, like: Like) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE film_id = $1 AND user_id = $2")
            .bind(like.film_id)
            .bind(like.user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn exists(&self, like: Like) -> AppResult<bool> {
        let exists = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE film_id = $1 AND user_id = $2)",
        )
        .bind(like.film_id)
        .bind(like.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn users_for_film(&self, film_id: FilmId) -> AppResult<Vec<UserId>> {
        let users = sqlx::query_scalar("SELECT user_id FROM likes WHERE film_id = $1 ORDER BY user_id")
            .bind(film_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn films_for_user(&self, user_id: UserId) -> AppResult<Vec<FilmId>> {
        let films = sqlx::query_scalar("SELECT film_id FROM likes WHERE user_id = $1 ORDER BY film_id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(films)
    }

    async fn likes_for_films(&self, film_ids: &[FilmId]) -> AppResult<Vec<Like>> {
        if film_ids.is_empty() {
            return Ok(Vec::new());
        }

        let likes = sqlx::query_as(
            "SELECT film_id, user_id FROM likes WHERE film_id = ANY($1) ORDER BY film_id, user_id",
        )
        .bind(raw_ids(film_ids, |id| id.0))
        .fetch_all(&self.pool)
        .await?;
        Ok(likes)
    }

    async fn counts_for_films(&self, film_ids: &[FilmId]) -> AppResult<HashMap<FilmId, u64>> {
        if film_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(FilmId, i64)> = sqlx::query_as(
            r#"
            SELECT film_id, COUNT(*) AS likes
            FROM likes
            WHERE film_id = ANY($1)
            GROUP BY film_id
            "#,
        )
        .bind(raw_ids(film_ids, |id| id.0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(film_id, count)| (film_id, count.max(0) as u64))
            .collect())
    }
}

#[async_trait::async_trait]
impl FriendStore for PgStore {
    async fn insert(&self, edge: Friendship) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO friendships (user_low, user_high, requester, confirmed)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_low, user_high) DO NOTHING
            "#,
        )
        .bind(edge.pair.low())
        .bind(edge.pair.high())
        .bind(edge.requester)
        .bind(edge.confirmed)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, pair: FriendPair) -> AppResult<Option<Friendship>> {
        let row: Option<FriendshipRow> = sqlx::query_as(
            r#"
            SELECT user_low, user_high, requester, confirmed
            FROM friendships
            WHERE user_low = $1 AND user_high = $2
            "#,
        )
        .bind(pair.low())
        .bind(pair.high())
        .fetch_optional(&self.pool)
        .await?;

        row.map(FriendshipRow::into_friendship).transpose()
    }

    async fn mark_confirmed(&self, pair: FriendPair, requester: UserId) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE friendships SET confirmed = TRUE
            WHERE user_low = $1 AND user_high = $2 AND requester = $3
            "#,
        )
        .bind(pair.low())
        .bind(pair.high())
        .bind(requester)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, pair: FriendPair) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM friendships WHERE user_low = $1 AND user_high = $2")
            .bind(pair.low())
            .bind(pair.high())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn edges_for(&self, user_id: UserId) -> AppResult<Vec<Friendship>> {
        let rows: Vec<FriendshipRow> = sqlx::query_as(
            r#"
            SELECT user_low, user_high, requester, confirmed
            FROM friendships
            WHERE user_low = $1 OR user_high = $1
            ORDER BY user_low, user_high
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FriendshipRow::into_friendship).collect()
    }
}
