pub mod comment;
pub mod notification;
pub mod project;
pub mod task;
pub mod user;

pub use comment::{Comment, CreateCommentInput, UpdateCommentInput};
pub use notification::{MessageResponse, NewNotification, Notification, NotificationType};
pub use project::{CreateProjectInput, Project, ProjectDetails, UpdateProjectInput};
pub use task::{CreateTaskInput, Priority, Status, Task, TaskDetails, UpdateTaskInput};
pub use user::{CreateUserInput, Role, UpdateUserInput, UserDetails, UserProfile, UserRecord};
