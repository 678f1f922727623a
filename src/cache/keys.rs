//! Cache key templates. A mutation deletes the entity key together with every
//! listing key the entity appears in.

use uuid::Uuid;

pub const USERS_ALL: &str = "users:all";
pub const PROJECTS_ALL: &str = "projects";
pub const TASKS_ALL: &str = "tasks";
pub const COMMENTS_ALL: &str = "comments:all";
pub const PRIORITY_QUEUE: &str = "task_priority_queue";

pub fn user(id: Uuid) -> String {
    format!("user:{}", id)
}

pub fn project(id: Uuid) -> String {
    format!("project:{}", id)
}

pub fn user_projects(user_id: Uuid) -> String {
    format!("user:projects:{}", user_id)
}

pub fn task(id: Uuid) -> String {
    format!("task:{}", id)
}

pub fn user_tasks(user_id: Uuid) -> String {
    format!("user:tasks:{}", user_id)
}

pub fn project_tasks(project_id: Uuid) -> String {
    format!("project:tasks:{}", project_id)
}

pub fn comment(id: Uuid) -> String {
    format!("comment:{}", id)
}

pub fn task_comments(task_id: Uuid) -> String {
    format!("task:{}:comments", task_id)
}

pub fn notifications(user_id: Uuid) -> String {
    format!("notifications:{}", user_id)
}

pub fn rate_limit(ip: &str) -> String {
    format!("ratelimit:{}", ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_templates() {
        let id = Uuid::nil();
        assert_eq!(user(id), format!("user:{}", id));
        assert_eq!(task_comments(id), format!("task:{}:comments", id));
        assert_eq!(user_projects(id), format!("user:projects:{}", id));
        assert_eq!(rate_limit("10.0.0.1"), "ratelimit:10.0.0.1");
    }
}
