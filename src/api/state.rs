use std::sync::Arc;

use crate::db::{FilmStore, FriendStore, LikeStore, MemoryStore, UserStore};
use crate::services::{
    FriendshipGraph, LikeIndex, MutualFriendResolver, PopularityRanker, RecommendationEngine,
};

/// Shared application state
///
/// Cheap to clone: every field is a handle onto the same stores.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub films: Arc<dyn FilmStore>,
    pub likes: LikeIndex,
    pub friendships: FriendshipGraph,
    pub mutual_friends: MutualFriendResolver,
    pub ranker: PopularityRanker,
    pub recommendations: RecommendationEngine,
    pub default_popular_count: usize,
}

impl AppState {
    /// Wires the services onto one store implementing every storage contract
    pub fn new<S>(store: S, default_popular_count: usize) -> Self
    where
        S: UserStore + FilmStore + LikeStore + FriendStore + 'static,
    {
        let store = Arc::new(store);
        let users: Arc<dyn UserStore> = store.clone();
        let films: Arc<dyn FilmStore> = store.clone();
        let like_store: Arc<dyn LikeStore> = store.clone();
        let friend_store: Arc<dyn FriendStore> = store;

        let likes = LikeIndex::new(like_store, films.clone(), users.clone());
        let friendships = FriendshipGraph::new(friend_store, users.clone());

        Self {
            mutual_friends: MutualFriendResolver::new(friendships.clone(), users.clone()),
            ranker: PopularityRanker::new(films.clone(), likes.clone()),
            recommendations: RecommendationEngine::new(likes.clone(), films.clone(), users.clone()),
            users,
            films,
            likes,
            friendships,
            default_popular_count,
        }
    }

    /// State backed by a fresh in-memory store
    pub fn in_memory(default_popular_count: usize) -> Self {
        Self::new(MemoryStore::new(), default_popular_count)
    }
}
