//! GraphQL surface over the same services as the REST routes.
//!
//! The handler reads an optional bearer token; resolvers that need a caller fail with
//! `extensions.code = "UNAUTHENTICATED"` when it is missing. Role and ownership failures
//! carry the codes of the corresponding [`AppError`] variants.

mod mutation;
mod query;

use actix_web::{web, HttpRequest, HttpResponse};
use async_graphql::http::GraphiQLSource;
use async_graphql::{Context, EmptySubscription, ErrorExtensions, Schema};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::auth::middleware::bearer_token;
use crate::auth::Claims;
use crate::error::AppError;
use crate::state::AppState;

pub use mutation::MutationRoot;
pub use query::QueryRoot;

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(state: AppState) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(state)
        .finish()
}

/// `POST /graphql`
pub async fn graphql_handler(
    schema: web::Data<AppSchema>,
    state: web::Data<AppState>,
    req: HttpRequest,
    gql: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = gql.into_inner();
    let token = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);
    if let Some(token) = token {
        match state.jwt.verify_access(token) {
            Ok(claims) => request = request.data(claims),
            Err(e) => log::debug!("ignoring invalid graphql token: {}", e),
        }
    }
    schema.execute(request).await.into()
}

/// `GET /graphql`
pub async fn graphiql() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint("/graphql").finish())
}

fn state<'a>(ctx: &'a Context<'_>) -> async_graphql::Result<&'a AppState> {
    ctx.data::<AppState>()
}

/// The authenticated caller, or an `UNAUTHENTICATED` error.
fn viewer<'a>(ctx: &'a Context<'_>) -> async_graphql::Result<&'a Claims> {
    ctx.data_opt::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()).extend())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::tests::test_user;
    use crate::models::Role;
    use crate::routes::tests::test_state;
    use async_graphql::Request;

    fn code(response: &async_graphql::Response) -> Option<String> {
        let error = response.errors.first()?;
        let extensions = error.extensions.as_ref()?;
        match extensions.get("code")? {
            async_graphql::Value::String(code) => Some(code.clone()),
            _ => None,
        }
    }

    fn claims(state: &AppState, role: Role) -> Claims {
        let pair = state.jwt.issue(&test_user(role)).unwrap();
        state.jwt.verify_access(&pair.access_token).unwrap()
    }

    #[actix_rt::test]
    async fn test_anonymous_queries_are_unauthenticated() {
        let schema = build_schema(test_state());

        for query in ["{ me { id } }", "{ myNotifications { id } }", "{ projects { id } }"] {
            let response = schema.execute(query).await;
            assert_eq!(code(&response).as_deref(), Some("UNAUTHENTICATED"), "{}", query);
        }

        let response = schema
            .execute(r#"mutation { markAllNotificationsAsRead { message } }"#)
            .await;
        assert_eq!(code(&response).as_deref(), Some("UNAUTHENTICATED"));
    }

    #[actix_rt::test]
    async fn test_role_rules_match_rest() {
        let state = test_state();
        let user = claims(&state, Role::User);
        let schema = build_schema(state);

        let response = schema
            .execute(Request::new("{ tasks { id } }").data(user.clone()))
            .await;
        assert_eq!(code(&response).as_deref(), Some("FORBIDDEN"));

        let response = schema
            .execute(
                Request::new(format!(
                    r#"mutation {{ deleteTask(id: "{}") {{ message }} }}"#,
                    uuid::Uuid::new_v4()
                ))
                .data(user),
            )
            .await;
        assert_eq!(code(&response).as_deref(), Some("FORBIDDEN"));
    }

    #[actix_rt::test]
    async fn test_login_validation_error_code() {
        let schema = build_schema(test_state());
        let response = schema
            .execute(
                r#"mutation { login(input: { email: "nope", password: "password123" }) { accessToken } }"#,
            )
            .await;
        assert_eq!(code(&response).as_deref(), Some("VALIDATION_ERROR"));
    }
}
