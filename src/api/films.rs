use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use super::AppState;
use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{Film, FilmId, GenreId, NewFilm, UserId},
    services::PopularQuery,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularParams {
    pub count: Option<i64>,
    pub genre_id: Option<GenreId>,
    pub year: Option<i32>,
}

impl PopularParams {
    pub fn into_query(self, default_count: usize) -> AppResult<PopularQuery> {
        let count = match self.count {
            None => default_count,
            Some(count) if count > 0 => usize::try_from(count)
                .map_err(|_| AppError::InvalidInput(format!("count {} is too large", count)))?,
            Some(count) => {
                return Err(AppError::InvalidInput(format!(
                    "count must be positive, got {}",
                    count
                )))
            }
        };

        Ok(PopularQuery {
            count,
            genre_id: self.genre_id,
            year: self.year,
        })
    }
}

/// Add a film to the catalogue
pub async fn create_film(
    State(state): State<AppState>,
    Json(request): Json<NewFilm>,
) -> AppResult<(StatusCode, Json<Film>)> {
    let film = state.films.create(request).await?;
    Ok((StatusCode::CREATED, Json(film)))
}

pub async fn get_film(
    State(state): State<AppState>,
    Path(id): Path<FilmId>,
) -> AppResult<Json<Film>> {
    Ok(Json(state.films.get(id).await?))
}

pub async fn like_film(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((id, user_id)): Path<(FilmId, UserId)>,
) -> AppResult<StatusCode> {
    tracing::info!(request_id = %request_id, film_id = %id, user_id = %user_id, "Processing like");

    state.likes.like(id, user_id).await?;
    Ok(StatusCode::OK)
}

pub async fn unlike_film(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((id, user_id)): Path<(FilmId, UserId)>,
) -> AppResult<StatusCode> {
    tracing::info!(request_id = %request_id, film_id = %id, user_id = %user_id, "Processing unlike");

    state.likes.unlike(id, user_id).await?;
    Ok(StatusCode::OK)
}

/// Most liked films, optionally narrowed by genre and release year
pub async fn popular_films(
    State(state): State<AppState>,
    Query(params): Query<PopularParams>,
) -> AppResult<Json<Vec<Film>>> {
    let query = params.into_query(state.default_popular_count)?;
    Ok(Json(state.ranker.popular(query).await?))
}
