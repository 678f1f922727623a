use async_graphql::{Context, Object, Result, ResultExt};
use uuid::Uuid;

use super::{state, viewer};
use crate::models::{
    Notification, Project, ProjectDetails, Task, TaskDetails, UserDetails, UserProfile,
};
use crate::{notifications, services};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn me(&self, ctx: &Context<'_>) -> Result<UserDetails> {
        let claims = viewer(ctx)?;
        services::users::get(state(ctx)?, claims.sub).await.extend()
    }

    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<UserProfile>> {
        let claims = viewer(ctx)?;
        services::users::list(state(ctx)?, claims).await.extend()
    }

    async fn user(&self, ctx: &Context<'_>, id: Uuid) -> Result<UserDetails> {
        viewer(ctx)?;
        services::users::get(state(ctx)?, id).await.extend()
    }

    async fn projects(&self, ctx: &Context<'_>) -> Result<Vec<Project>> {
        viewer(ctx)?;
        services::projects::list(state(ctx)?).await.extend()
    }

    async fn project(&self, ctx: &Context<'_>, id: Uuid) -> Result<ProjectDetails> {
        viewer(ctx)?;
        services::projects::get(state(ctx)?, id).await.extend()
    }

    async fn my_projects(&self, ctx: &Context<'_>) -> Result<Vec<Project>> {
        let claims = viewer(ctx)?;
        services::projects::for_user(state(ctx)?, claims.sub)
            .await
            .extend()
    }

    async fn tasks(&self, ctx: &Context<'_>) -> Result<Vec<Task>> {
        let claims = viewer(ctx)?;
        services::tasks::list(state(ctx)?, claims).await.extend()
    }

    async fn task(&self, ctx: &Context<'_>, id: Uuid) -> Result<TaskDetails> {
        viewer(ctx)?;
        services::tasks::get(state(ctx)?, id).await.extend()
    }

    async fn tasks_by_project(&self, ctx: &Context<'_>, project_id: Uuid) -> Result<Vec<Task>> {
        let claims = viewer(ctx)?;
        services::tasks::for_project(state(ctx)?, claims, project_id)
            .await
            .extend()
    }

    async fn tasks_by_assignee(&self, ctx: &Context<'_>, assignee_id: Uuid) -> Result<Vec<Task>> {
        viewer(ctx)?;
        services::tasks::for_assignee(state(ctx)?, assignee_id)
            .await
            .extend()
    }

    async fn my_notifications(&self, ctx: &Context<'_>) -> Result<Vec<Notification>> {
        let claims = viewer(ctx)?;
        notifications::find_all(state(ctx)?, claims.sub).await.extend()
    }
}
