use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::aggregate::refresh_average_rating;
use super::{populate_bootcamps, to_json};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::filter::ListQuery;
use crate::models::{Review, ReviewInput};
use crate::policy::{ensure_can_mutate, Principal};
use crate::store::Page;

pub struct ReviewService<'a> {
    ctx: &'a AppContext,
}

impl<'a> ReviewService<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    pub async fn for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, ApiError> {
        let stores = &self.ctx.stores;
        if stores.bootcamps.find_bootcamp(bootcamp_id).await?.is_none() {
            return Err(ApiError::resource_not_found("Bootcamp", bootcamp_id));
        }
        Ok(stores.reviews.reviews_for_bootcamp(bootcamp_id).await?)
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<Value>, ApiError> {
        let page = self.ctx.stores.reviews.list_reviews(query).await?;
        let items = page
            .items
            .iter()
            .map(|r| Ok((r.bootcamp_id, query.project(to_json(r)?))))
            .collect::<Result<Vec<_>, ApiError>>()?;
        let items = populate_bootcamps(&self.ctx.stores, items).await?;
        Ok(Page { items, total: page.total })
    }

    pub async fn get(&self, id: Uuid) -> Result<Value, ApiError> {
        let review = self.find(id).await?;
        let mut populated = populate_bootcamps(&self.ctx.stores, vec![(review.bootcamp_id, to_json(&review)?)]).await?;
        populated.pop().ok_or_else(|| ApiError::resource_not_found("Review", id))
    }

    /// One review per user and bootcamp; a second attempt is a duplicate.
    pub async fn create(&self, principal: &Principal, bootcamp_id: Uuid, input: ReviewInput) -> Result<Review, ApiError> {
        let stores = &self.ctx.stores;
        let bootcamp = stores
            .bootcamps
            .find_bootcamp(bootcamp_id)
            .await?
            .ok_or_else(|| ApiError::resource_not_found("Bootcamp", bootcamp_id))?;

        let review = Review::from_input(input, bootcamp.id, principal.id)?;
        stores.reviews.insert_review(&review).await?;
        refresh_average_rating(stores, bootcamp.id).await;

        info!("Review {} added to bootcamp {} by {}", review.id, bootcamp.id, principal.id);
        Ok(review)
    }

    pub async fn update(&self, principal: &Principal, id: Uuid, input: ReviewInput) -> Result<Review, ApiError> {
        let mut review = self.find(id).await?;
        ensure_can_mutate(principal, &review, "update this review")?;

        review.apply_update(input)?;
        if !self.ctx.stores.reviews.update_review(&review).await? {
            return Err(ApiError::resource_not_found("Review", id));
        }
        refresh_average_rating(&self.ctx.stores, review.bootcamp_id).await;
        Ok(review)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), ApiError> {
        let review = self.find(id).await?;
        ensure_can_mutate(principal, &review, "delete this review")?;

        self.ctx.stores.reviews.delete_review(id).await?;
        refresh_average_rating(&self.ctx.stores, review.bootcamp_id).await;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Review, ApiError> {
        self.ctx
            .stores
            .reviews
            .find_review(id)
            .await?
            .ok_or_else(|| ApiError::resource_not_found("Review", id))
    }
}
