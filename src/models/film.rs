use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{DirectorId, FilmId, GenreId, MpaId};
use crate::error::{AppError, AppResult};

/// Longest accepted film description, in characters
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Films released before the first public screening are rejected
pub fn earliest_release_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1895, 12, 28).unwrap_or(NaiveDate::MIN)
}

/// Film genre reference record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Genre {
    pub id: GenreId,
    #[serde(default)]
    pub name: String,
}

/// MPA rating classification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Mpa {
    pub id: MpaId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Director {
    pub id: DirectorId,
    #[serde(default)]
    pub name: String,
}

/// Represents a catalogued film
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: FilmId,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    /// Running time in minutes
    pub duration: i32,
    pub mpa: Option<Mpa>,
    pub genres: Vec<Genre>,
    pub directors: Vec<Director>,
}

impl Film {
    pub fn release_year(&self) -> i32 {
        self.release_date.year()
    }

    pub fn genre_ids(&self) -> BTreeSet<GenreId> {
        self.genres.iter().map(|genre| genre.id).collect()
    }
}

/// Payload for adding a film to the catalogue
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFilm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    #[serde(default)]
    pub mpa: Option<Mpa>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub directors: Vec<Director>,
}

impl NewFilm {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput("film name cannot be empty".to_string()));
        }

        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AppError::InvalidInput(format!(
                "description is longer than {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }

        if self.release_date < earliest_release_date() {
            return Err(AppError::InvalidInput(format!(
                "release date {} is before {}",
                self.release_date,
                earliest_release_date()
            )));
        }

        if self.duration <= 0 {
            return Err(AppError::InvalidInput(
                "duration must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Builds the stored film, collapsing repeated genres and directors
    pub fn into_film(self, id: FilmId) -> AppResult<Film> {
        self.validate()?;

        let mut genres = self.genres;
        genres.sort_by_key(|genre| genre.id);
        genres.dedup_by_key(|genre| genre.id);

        let mut directors = self.directors;
        directors.sort_by_key(|director| director.id);
        directors.dedup_by_key(|director| director.id);

        Ok(Film {
            id,
            name: self.name,
            description: self.description,
            release_date: self.release_date,
            duration: self.duration,
            mpa: self.mpa,
            genres,
            directors,
        })
    }
}
