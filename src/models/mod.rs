use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod film;
pub mod friendship;
pub mod like;
pub mod user;

pub use film::{Director, Film, Genre, Mpa, NewFilm};
pub use friendship::{FriendPair, Friendship};
pub use like::Like;
pub use user::{NewUser, User};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub $inner);

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a registered user
    UserId(i64)
);
id_type!(
    /// Identifier of a catalogued film
    FilmId(i64)
);
id_type!(GenreId(i32));
id_type!(
    /// Identifier of an MPA rating classification
    MpaId(i32)
);
id_type!(DirectorId(i64));
