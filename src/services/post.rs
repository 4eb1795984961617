//! Blog post service

use crate::db::repositories::PostRepository;
use crate::models::Post;
use anyhow::Result;
use std::sync::Arc;

pub struct PostService {
    repo: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    /// Every published post, newest first
    pub async fn list(&self) -> Result<Vec<Post>> {
        self.repo.list().await
    }
}
