//! # Search
//!
//! Full-text search over tasks and projects. Documents live in the Meilisearch index
//! `project_management` as `task_<id>` / `project_<id>` and are kept in sync by the task
//! and project services. Without a configured index the same request is answered by an
//! `ILIKE` query against Postgres.

use chrono::{DateTime, Utc};
use meilisearch_sdk::client::Client;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{project::PROJECT_COLUMNS, task::TASK_COLUMNS};
use crate::models::{Priority, Project, Status, Task};

pub const INDEX: &str = "project_management";
const PRIMARY_KEY: &str = "docId";
const FILTERABLE: [&str; 5] = ["type", "status", "priority", "projectId", "assigneeId"];
const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Task,
    Project,
}

impl DocumentKind {
    fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Task => "task",
            DocumentKind::Project => "project",
        }
    }
}

/// What is stored in the index for a task or a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    pub doc_id: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn document_id(kind: DocumentKind, id: Uuid) -> String {
    format!("{}_{}", kind.as_str(), id)
}

impl From<&Task> for SearchDocument {
    fn from(task: &Task) -> Self {
        Self {
            doc_id: document_id(DocumentKind::Task, task.id),
            kind: DocumentKind::Task,
            title: task.title.clone(),
            description: task.description.clone(),
            status: Some(task.status),
            priority: Some(task.priority),
            project_id: Some(task.project_id),
            assignee_id: task.assignee_id,
            creator_id: Some(task.creator_id),
            owner_id: None,
            due_date: task.due_date,
            start_date: None,
            end_date: None,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

impl From<&Project> for SearchDocument {
    fn from(project: &Project) -> Self {
        Self {
            doc_id: document_id(DocumentKind::Project, project.id),
            kind: DocumentKind::Project,
            title: project.name.clone(),
            description: project.description.clone(),
            status: Some(project.status),
            priority: None,
            project_id: None,
            assignee_id: None,
            creator_id: None,
            owner_id: Some(project.owner_id),
            due_date: None,
            start_date: project.start_date,
            end_date: project.end_date,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// `GET /api/search` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "type")]
    pub kind: Option<DocumentKind>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub limit: Option<usize>,
}

impl SearchQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Filters only tasks carry; a project can never match them.
    fn has_task_only_filters(&self) -> bool {
        self.priority.is_some() || self.project_id.is_some() || self.assignee_id.is_some()
    }
}

/// One result: the entity id, its relevance (absent for database matches) and the document.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    pub id: Uuid,
    pub score: Option<f64>,
    #[serde(flatten)]
    pub document: SearchDocument,
}

impl SearchHit {
    fn from_document(document: SearchDocument, score: Option<f64>) -> Option<Self> {
        let (_, raw_id) = document.doc_id.split_once('_')?;
        let id = Uuid::parse_str(raw_id).ok()?;
        Some(Self {
            id,
            score,
            document,
        })
    }
}

/// Meilisearch filter expression for the query's filters, if it has any.
pub fn build_filter(query: &SearchQuery) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(kind) = query.kind {
        clauses.push(format!("type = \"{}\"", kind.as_str()));
    }
    if let Some(status) = query.status {
        clauses.push(format!("status = \"{}\"", status));
    }
    if let Some(priority) = query.priority {
        clauses.push(format!("priority = \"{}\"", priority));
    }
    if let Some(project_id) = query.project_id {
        clauses.push(format!("projectId = \"{}\"", project_id));
    }
    if let Some(assignee_id) = query.assignee_id {
        clauses.push(format!("assigneeId = \"{}\"", assignee_id));
    }
    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

/// Escapes `ILIKE` wildcards in user input and wraps it for a substring match.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct SearchService {
    client: Option<Client>,
}

impl SearchService {
    pub fn new(url: Option<&str>, key: Option<&str>) -> Result<Self, AppError> {
        let client = match url {
            Some(url) => Some(Client::new(url, key.map(str::to_string))?),
            None => None,
        };
        Ok(Self { client })
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_indexed(&self) -> bool {
        self.client.is_some()
    }

    /// Declares the filterable attributes. Run once at startup.
    pub async fn prepare_index(&self) -> Result<(), AppError> {
        if let Some(client) = &self.client {
            client
                .index(INDEX)
                .set_filterable_attributes(FILTERABLE)
                .await?;
        }
        Ok(())
    }

    pub async fn index_task(&self, task: &Task) {
        self.upsert(SearchDocument::from(task)).await
    }

    pub async fn index_project(&self, project: &Project) {
        self.upsert(SearchDocument::from(project)).await
    }

    /// Index failures are logged; the database stays the source of truth.
    async fn upsert(&self, document: SearchDocument) {
        let Some(client) = &self.client else {
            return;
        };
        if let Err(e) = client
            .index(INDEX)
            .add_or_update(&[document.clone()], Some(PRIMARY_KEY))
            .await
        {
            log::warn!("failed to index {}: {}", document.doc_id, e);
        }
    }

    pub async fn remove(&self, kind: DocumentKind, id: Uuid) {
        let Some(client) = &self.client else {
            return;
        };
        let doc_id = document_id(kind, id);
        if let Err(e) = client.index(INDEX).delete_document(&doc_id).await {
            log::warn!("failed to remove {} from the index: {}", doc_id, e);
        }
    }

    pub async fn search(
        &self,
        pool: &PgPool,
        query: &SearchQuery,
    ) -> Result<Vec<SearchHit>, AppError> {
        match &self.client {
            Some(client) => search_index(client, query).await,
            None => search_database(pool, query).await,
        }
    }
}

async fn search_index(client: &Client, query: &SearchQuery) -> Result<Vec<SearchHit>, AppError> {
    let index = client.index(INDEX);
    let filter = build_filter(query);
    let mut request = index.search();
    request
        .with_query(&query.q)
        .with_limit(query.limit())
        .with_show_ranking_score(true);
    if let Some(filter) = filter.as_deref() {
        request.with_filter(filter);
    }
    let results = request.execute::<SearchDocument>().await?;
    Ok(results
        .hits
        .into_iter()
        .filter_map(|hit| SearchHit::from_document(hit.result, hit.ranking_score))
        .collect())
}

async fn search_database(pool: &PgPool, query: &SearchQuery) -> Result<Vec<SearchHit>, AppError> {
    let pattern = like_pattern(query.q.trim());
    let limit = query.limit() as i64;
    let mut hits = Vec::new();

    if query.kind != Some(DocumentKind::Project) {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks \
             WHERE (title ILIKE $1 OR description ILIKE $1) \
               AND ($2::work_status IS NULL OR status = $2) \
               AND ($3::task_priority IS NULL OR priority = $3) \
               AND ($4::uuid IS NULL OR project_id = $4) \
               AND ($5::uuid IS NULL OR assignee_id = $5) \
             ORDER BY created_at DESC LIMIT $6",
            TASK_COLUMNS
        ))
        .bind(&pattern)
        .bind(query.status)
        .bind(query.priority)
        .bind(query.project_id)
        .bind(query.assignee_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        hits.extend(tasks.iter().map(|task| SearchHit {
            id: task.id,
            score: None,
            document: SearchDocument::from(task),
        }));
    }

    if query.kind != Some(DocumentKind::Task) && !query.has_task_only_filters() {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects \
             WHERE (name ILIKE $1 OR description ILIKE $1) \
               AND ($2::work_status IS NULL OR status = $2) \
             ORDER BY created_at DESC LIMIT $3",
            PROJECT_COLUMNS
        ))
        .bind(&pattern)
        .bind(query.status)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        hits.extend(projects.iter().map(|project| SearchHit {
            id: project.id,
            score: None,
            document: SearchDocument::from(project),
        }));
    }

    hits.sort_by(|a, b| b.document.created_at.cmp(&a.document.created_at));
    hits.truncate(query.limit());
    Ok(hits)
}
