//! Authorization policies
//!
//! Pure evaluation of the named access rules against the caller's roles and
//! claims. The HTTP layer resolves the caller and the route `id`, then asks
//! `evaluate` for a decision.

use crate::models::{UserClaim, ADMINISTRATOR, MODERATOR};
use serde::Serialize;

/// The authenticated caller with everything the policies look at
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub roles: Vec<String>,
    #[serde(skip)]
    pub claims: Vec<UserClaim>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMINISTRATOR)
    }

    /// Administrator or Moderator
    pub fn is_staff(&self) -> bool {
        self.has_role(ADMINISTRATOR) || self.has_role(MODERATOR)
    }

    /// Whether the caller holds the ownership claim for this article id
    pub fn owns_article(&self, article_id: &str) -> bool {
        self.claims.iter().any(|c| c.is_article_owner_of(article_id))
    }
}

/// Named access rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Any signed-in user
    Authenticated,
    /// Administrator, Moderator, or holder of the `ArticleOwner` claim for the route id
    OwnerOrAdminOrModerator,
    AdministratorOrModerator,
    Administrator,
    Moderator,
}

/// Outcome of a policy check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No caller; maps to 401
    Unauthenticated,
    /// Caller known but not permitted; maps to 403
    Forbidden,
}

/// Decide whether `principal` satisfies `policy`.
///
/// `route_id` is the `id` path parameter of the current request, if any.
pub fn evaluate(policy: Policy, principal: Option<&Principal>, route_id: Option<&str>) -> Decision {
    let Some(principal) = principal else {
        return Decision::Unauthenticated;
    };

    let allowed = match policy {
        Policy::Authenticated => true,
        Policy::OwnerOrAdminOrModerator => {
            principal.is_staff() || route_id.is_some_and(|id| principal.owns_article(id))
        }
        Policy::AdministratorOrModerator => principal.is_staff(),
        Policy::Administrator => principal.has_role(ADMINISTRATOR),
        Policy::Moderator => principal.has_role(MODERATOR),
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Forbidden
    }
}
