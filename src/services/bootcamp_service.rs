use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::geocoder::EARTH_RADIUS_MILES;
use super::to_json;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::filter::ListQuery;
use crate::models::{Bootcamp, BootcampInput, Location};
use crate::policy::{can_create_bootcamp, ensure_can_mutate, Principal};
use crate::store::Page;

pub struct BootcampService<'a> {
    ctx: &'a AppContext,
}

impl<'a> BootcampService<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Filtered page of bootcamps, each carrying its `courses`.
    pub async fn list(&self, query: &ListQuery) -> Result<Page<Value>, ApiError> {
        let page = self.ctx.stores.bootcamps.list_bootcamps(query).await?;
        let ids: Vec<Uuid> = page.items.iter().map(|b| b.id).collect();
        let courses = self.ctx.stores.courses.courses_for_bootcamps(&ids).await?;

        let mut items = Vec::with_capacity(page.items.len());
        for bootcamp in &page.items {
            let mut value = query.project(to_json(bootcamp)?);
            let own: Vec<_> = courses.iter().filter(|c| c.bootcamp_id == bootcamp.id).collect();
            if let Value::Object(map) = &mut value {
                map.insert("courses".to_string(), to_json(&own)?);
            }
            items.push(value);
        }
        Ok(Page { items, total: page.total })
    }

    pub async fn get(&self, id: Uuid) -> Result<Bootcamp, ApiError> {
        self.ctx
            .stores
            .bootcamps
            .find_bootcamp(id)
            .await?
            .ok_or_else(|| ApiError::resource_not_found("Bootcamp", id))
    }

    pub async fn create(&self, principal: &Principal, input: BootcampInput) -> Result<Bootcamp, ApiError> {
        let mut bootcamp = Bootcamp::from_input(input, principal.id)?;
        bootcamp.location = self.locate(&bootcamp.address).await;

        let who = *principal;
        let admitted = self
            .ctx
            .stores
            .bootcamps
            .insert_bootcamp(&bootcamp, &move |owned| can_create_bootcamp(&who, owned))
            .await?;
        if !admitted {
            return Err(ApiError::bad_request(format!(
                "The user with ID {} has already published a bootcamp",
                principal.id
            )));
        }

        info!("Bootcamp {} created by {}", bootcamp.id, principal.id);
        Ok(bootcamp)
    }

    pub async fn update(&self, principal: &Principal, id: Uuid, input: BootcampInput) -> Result<Bootcamp, ApiError> {
        let mut bootcamp = self.get(id).await?;
        ensure_can_mutate(principal, &bootcamp, "update this bootcamp")?;

        let previous_address = bootcamp.address.clone();
        bootcamp.apply_update(input)?;
        if bootcamp.address != previous_address {
            bootcamp.location = self.locate(&bootcamp.address).await;
        }

        if !self.ctx.stores.bootcamps.update_bootcamp(&bootcamp).await? {
            return Err(ApiError::resource_not_found("Bootcamp", id));
        }
        Ok(bootcamp)
    }

    /// Delete a bootcamp together with its courses and reviews.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), ApiError> {
        let bootcamp = self.get(id).await?;
        ensure_can_mutate(principal, &bootcamp, "delete this bootcamp")?;

        let stores = &self.ctx.stores;
        let courses = stores.courses.delete_courses_for_bootcamp(id).await?;
        let reviews = stores.reviews.delete_reviews_for_bootcamp(id).await?;
        stores.bootcamps.delete_bootcamp(id).await?;
        info!("Bootcamp {} deleted with {} courses and {} reviews", id, courses, reviews);
        Ok(())
    }

    /// Bootcamps within `distance` miles of the zipcode's coordinates.
    pub async fn within_radius(&self, zipcode: &str, distance: f64) -> Result<Vec<Bootcamp>, ApiError> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(ApiError::bad_request("Please provide a valid distance"));
        }
        let origin = self
            .ctx
            .geocoder
            .geocode(zipcode)
            .await
            .map_err(|e| {
                error!("Geocoding {} failed: {}", zipcode, e);
                ApiError::internal_server_error("Server Error")
            })?
            .ok_or_else(|| ApiError::bad_request(format!("Could not locate zipcode {}", zipcode)))?;

        let radius = distance / EARTH_RADIUS_MILES;
        let found = self
            .ctx
            .stores
            .bootcamps
            .bootcamps_within(origin.longitude(), origin.latitude(), radius)
            .await?;
        Ok(found)
    }

    /// Best-effort geocode; failures leave the bootcamp without a location.
    async fn locate(&self, address: &str) -> Option<Location> {
        match self.ctx.geocoder.geocode(address).await {
            Ok(location) => location,
            Err(e) => {
                warn!("Geocoding failed for {:?}: {}", address, e);
                None
            }
        }
    }
}

