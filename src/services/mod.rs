//! Services layer - Business logic
//!
//! Services validate input, enforce the domain rules and translate store
//! failures into typed errors. They depend on repository traits only.

pub mod article;
pub mod authorization;
pub mod comment;
pub mod password;
pub mod role;
pub mod tag;
pub mod user;

pub use article::{sort_order, tag_selection_union, ArticleService, ArticleServiceError};
pub use authorization::{evaluate, Decision, Policy, Principal};
pub use comment::{CommentService, CommentServiceError};
pub use password::{hash_password, verify_password};
pub use role::{RoleService, RoleServiceError};
pub use tag::{TagService, TagServiceError};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
