use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::to_json;
use crate::auth::password::hash_password;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::filter::ListQuery;
use crate::models::{User, UserInput};
use crate::store::Page;

/// Admin-only user management.
pub struct UserService<'a> {
    ctx: &'a AppContext,
}

impl<'a> UserService<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// One page of users, projected by `select`.
    pub async fn list(&self, query: &ListQuery) -> Result<Page<Value>, ApiError> {
        let page = self.ctx.stores.users.list_users(query).await?;
        let items = page
            .items
            .iter()
            .map(|u| Ok(query.project(to_json(u)?)))
            .collect::<Result<Vec<_>, ApiError>>()?;
        Ok(Page { items, total: page.total })
    }

    pub async fn get(&self, id: Uuid) -> Result<User, ApiError> {
        self.ctx
            .stores
            .users
            .find_user(id)
            .await?
            .ok_or_else(|| ApiError::resource_not_found("User", id))
    }

    /// Create a user with any role, admin included.
    pub async fn create(&self, input: UserInput) -> Result<User, ApiError> {
        let (name, email, password, role) = input.into_new()?;
        let user = User::new(name, email, role, hash_password(&password)?);
        self.ctx.stores.users.insert_user(&user).await?;
        info!("User {} created with role {}", user.id, user.role);
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, input: UserInput) -> Result<User, ApiError> {
        let mut user = self.get(id).await?;
        user.apply_update(input)?;
        if !self.ctx.stores.users.update_user(&user).await? {
            return Err(ApiError::resource_not_found("User", id));
        }
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        if !self.ctx.stores.users.delete_user(id).await? {
            return Err(ApiError::resource_not_found("User", id));
        }
        info!("User {} deleted", id);
        Ok(())
    }
}
