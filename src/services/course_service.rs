use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::aggregate::refresh_average_cost;
use super::{populate_bootcamps, to_json};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::filter::ListQuery;
use crate::models::{Course, CourseInput};
use crate::policy::{ensure_can_mutate, Principal};
use crate::store::Page;

pub struct CourseService<'a> {
    ctx: &'a AppContext,
}

impl<'a> CourseService<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Every course of one bootcamp, oldest first.
    pub async fn for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Course>, ApiError> {
        let stores = &self.ctx.stores;
        if stores.bootcamps.find_bootcamp(bootcamp_id).await?.is_none() {
            return Err(ApiError::resource_not_found("Bootcamp", bootcamp_id));
        }
        Ok(stores.courses.courses_for_bootcamps(&[bootcamp_id]).await?)
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<Value>, ApiError> {
        let page = self.ctx.stores.courses.list_courses(query).await?;
        let items = page
            .items
            .iter()
            .map(|c| Ok((c.bootcamp_id, query.project(to_json(c)?))))
            .collect::<Result<Vec<_>, ApiError>>()?;
        let items = populate_bootcamps(&self.ctx.stores, items).await?;
        Ok(Page { items, total: page.total })
    }

    /// One course with its bootcamp summary.
    pub async fn get(&self, id: Uuid) -> Result<Value, ApiError> {
        let course = self.find(id).await?;
        let mut populated = populate_bootcamps(&self.ctx.stores, vec![(course.bootcamp_id, to_json(&course)?)]).await?;
        populated.pop().ok_or_else(|| ApiError::resource_not_found("Course", id))
    }

    /// Add a course to a bootcamp the principal owns (or any bootcamp, for admins).
    pub async fn create(&self, principal: &Principal, bootcamp_id: Uuid, input: CourseInput) -> Result<Course, ApiError> {
        let stores = &self.ctx.stores;
        let bootcamp = stores
            .bootcamps
            .find_bootcamp(bootcamp_id)
            .await?
            .ok_or_else(|| ApiError::resource_not_found("Bootcamp", bootcamp_id))?;
        ensure_can_mutate(principal, &bootcamp, &format!("add a course to bootcamp {}", bootcamp.id))?;

        let course = Course::from_input(input, bootcamp.id, principal.id)?;
        stores.courses.insert_course(&course).await?;
        refresh_average_cost(stores, bootcamp.id).await;

        info!("Course {} added to bootcamp {}", course.id, bootcamp.id);
        Ok(course)
    }

    pub async fn update(&self, principal: &Principal, id: Uuid, input: CourseInput) -> Result<Course, ApiError> {
        let mut course = self.find(id).await?;
        ensure_can_mutate(principal, &course, &format!("update course {}", course.id))?;

        course.apply_update(input)?;
        if !self.ctx.stores.courses.update_course(&course).await? {
            return Err(ApiError::resource_not_found("Course", id));
        }
        refresh_average_cost(&self.ctx.stores, course.bootcamp_id).await;
        Ok(course)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), ApiError> {
        let course = self.find(id).await?;
        ensure_can_mutate(principal, &course, &format!("delete course {}", course.id))?;

        self.ctx.stores.courses.delete_course(id).await?;
        refresh_average_cost(&self.ctx.stores, course.bootcamp_id).await;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Course, ApiError> {
        self.ctx
            .stores
            .courses
            .find_course(id)
            .await?
            .ok_or_else(|| ApiError::resource_not_found("Course", id))
    }
}
