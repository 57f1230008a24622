//! Data models
//!
//! Database entities (Article, Tag, Comment, User, Role, Session) plus the
//! request and view types exchanged with the HTTP layer.

mod article;
mod comment;
mod role;
mod session;
mod tag;
mod user;

pub use article::{
    Article, ArticleDetail, AuthorSummary, CreateArticleInput, EditArticleRequest, ListParams,
    PagedResult, SortKey, MAX_CONTENT_LENGTH, MAX_TITLE_LENGTH,
};
pub use comment::{
    Comment, CreateCommentInput, EditCommentRequest, MAX_COMMENT_LENGTH,
    MAX_COMMENT_TITLE_LENGTH,
};
pub use role::{
    CreateRoleInput, EditRoleRequest, Role, RoleCheckbox, ADMINISTRATOR, MAX_ROLE_NAME_LENGTH,
    MODERATOR, USER,
};
pub use session::Session;
pub use tag::{Tag, TagCheckbox, TagSelection, TagWithCount, MAX_TAG_NAME_LENGTH};
pub use user::{
    EditUserRequest, User, UserClaim, UserEditView, UserView, ARTICLE_OWNER_CLAIM,
    MAX_PERSON_NAME_LENGTH,
};
