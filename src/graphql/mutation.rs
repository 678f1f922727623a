use async_graphql::{Context, Object, Result, ResultExt};
use uuid::Uuid;

use super::{state, viewer};
use crate::auth::{AuthResponse, LoginRequest, RefreshRequest};
use crate::models::{
    CreateProjectInput, CreateTaskInput, CreateUserInput, MessageResponse, Notification,
    ProjectDetails, TaskDetails, UpdateProjectInput, UpdateTaskInput, UpdateUserInput,
    UserProfile,
};
use crate::{notifications, services};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn login(&self, ctx: &Context<'_>, input: LoginRequest) -> Result<AuthResponse> {
        services::auth::login(state(ctx)?, input).await.extend()
    }

    async fn register(&self, ctx: &Context<'_>, input: CreateUserInput) -> Result<AuthResponse> {
        services::auth::register(state(ctx)?, input).await.extend()
    }

    async fn refresh_token(&self, ctx: &Context<'_>, refresh_token: String) -> Result<AuthResponse> {
        services::auth::refresh(state(ctx)?, RefreshRequest { refresh_token })
            .await
            .extend()
    }

    async fn create_user(&self, ctx: &Context<'_>, input: CreateUserInput) -> Result<UserProfile> {
        let claims = viewer(ctx)?;
        services::users::create(state(ctx)?, claims, input)
            .await
            .extend()
    }

    async fn update_user(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: UpdateUserInput,
    ) -> Result<UserProfile> {
        let claims = viewer(ctx)?;
        services::users::update(state(ctx)?, claims, id, input)
            .await
            .extend()
    }

    async fn remove_user(&self, ctx: &Context<'_>, id: Uuid) -> Result<MessageResponse> {
        let claims = viewer(ctx)?;
        services::users::delete(state(ctx)?, claims, id).await.extend()
    }

    async fn create_project(
        &self,
        ctx: &Context<'_>,
        input: CreateProjectInput,
    ) -> Result<ProjectDetails> {
        let claims = viewer(ctx)?;
        services::projects::create(state(ctx)?, claims, input)
            .await
            .extend()
    }

    async fn update_project(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: UpdateProjectInput,
    ) -> Result<ProjectDetails> {
        let claims = viewer(ctx)?;
        services::projects::update(state(ctx)?, claims, id, input)
            .await
            .extend()
    }

    async fn delete_project(&self, ctx: &Context<'_>, id: Uuid) -> Result<MessageResponse> {
        let claims = viewer(ctx)?;
        services::projects::delete(state(ctx)?, claims, id)
            .await
            .extend()
    }

    async fn add_project_member(
        &self,
        ctx: &Context<'_>,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<ProjectDetails> {
        let claims = viewer(ctx)?;
        services::projects::add_member(state(ctx)?, claims, project_id, user_id)
            .await
            .extend()
    }

    async fn remove_project_member(
        &self,
        ctx: &Context<'_>,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<ProjectDetails> {
        let claims = viewer(ctx)?;
        services::projects::remove_member(state(ctx)?, claims, project_id, user_id)
            .await
            .extend()
    }

    async fn create_task(&self, ctx: &Context<'_>, input: CreateTaskInput) -> Result<TaskDetails> {
        let claims = viewer(ctx)?;
        services::tasks::create(state(ctx)?, claims, input)
            .await
            .extend()
    }

    async fn update_task(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: UpdateTaskInput,
    ) -> Result<TaskDetails> {
        let claims = viewer(ctx)?;
        services::tasks::update(state(ctx)?, claims, id, input)
            .await
            .extend()
    }

    async fn delete_task(&self, ctx: &Context<'_>, id: Uuid) -> Result<MessageResponse> {
        let claims = viewer(ctx)?;
        services::tasks::delete(state(ctx)?, claims, id).await.extend()
    }

    async fn mark_notification_as_read(&self, ctx: &Context<'_>, id: Uuid) -> Result<Notification> {
        let claims = viewer(ctx)?;
        notifications::mark_as_read(state(ctx)?, id, claims.sub)
            .await
            .extend()
    }

    async fn mark_all_notifications_as_read(&self, ctx: &Context<'_>) -> Result<MessageResponse> {
        let claims = viewer(ctx)?;
        notifications::mark_all_as_read(state(ctx)?, claims.sub)
            .await
            .extend()
    }

    async fn delete_notification(&self, ctx: &Context<'_>, id: Uuid) -> Result<MessageResponse> {
        let claims = viewer(ctx)?;
        notifications::delete(state(ctx)?, id, claims.sub)
            .await
            .extend()
    }
}
