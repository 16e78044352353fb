pub mod friendships;
pub mod likes;
pub mod mutual_friends;
pub mod popularity;
pub mod recommendations;

pub use friendships::FriendshipGraph;
pub use likes::LikeIndex;
pub use mutual_friends::MutualFriendResolver;
pub use popularity::{PopularQuery, PopularityRanker};
pub use recommendations::RecommendationEngine;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use crate::db::{FilmStore, FriendStore, LikeStore, MemoryStore, UserStore};
    use crate::models::{FilmId, Genre, GenreId, NewFilm, NewUser};

    #[derive(Clone)]
    pub struct TestStore(pub MemoryStore);

    impl TestStore {
        pub fn users(&self) -> Arc<dyn UserStore> {
            Arc::new(self.0.clone())
        }

        pub fn films(&self) -> Arc<dyn FilmStore> {
            Arc::new(self.0.clone())
        }

        pub fn likes(&self) -> Arc<dyn LikeStore> {
            Arc::new(self.0.clone())
        }

        pub fn friends(&self) -> Arc<dyn FriendStore> {
            Arc::new(self.0.clone())
        }
    }

    pub fn new_film(year: i32, genres: &[i32]) -> NewFilm {
        NewFilm {
            name: format!("Film from {}", year),
            description: String::new(),
            release_date: NaiveDate::from_ymd_opt(year, 6, 1).unwrap(),
            duration: 100,
            mpa: None,
            genres: genres
                .iter()
                .map(|id| Genre {
                    id: GenreId(*id),
                    name: String::new(),
                })
                .collect(),
            directors: Vec::new(),
        }
    }

    pub async fn add_film(store: &TestStore, year: i32, genres: &[i32]) -> FilmId {
        FilmStore::create(&store.0, new_film(year, genres))
            .await
            .unwrap()
            .id
    }

    /// Store with users 1..=users and films 1..=films
    pub async fn seeded_store(users: usize, films: usize) -> TestStore {
        let store = TestStore(MemoryStore::new());
        for n in 1..=users {
            UserStore::create(
                &store.0,
                NewUser {
                    email: format!("user{}@example.com", n),
                    login: format!("user{}", n),
                    name: None,
                    birthday: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                },
            )
            .await
            .unwrap();
        }
        for _ in 0..films {
            add_film(&store, 2000, &[]).await;
        }
        store
    }
}
