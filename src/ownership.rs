use crate::{
    error::ApiError,
    models::{BookReview, User},
};

/// A resource that belongs to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

impl Owned for BookReview {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for User {
    fn owner_id(&self) -> i64 {
        self.id
    }
}

/// ensure_owner
///
/// Strict id equality between the authenticated user and the resource owner.
/// Roles play no part: an admin editing someone else's review is refused too.
pub fn ensure_owner<R: Owned + ?Sized>(user: &User, resource: &R) -> Result<(), ApiError> {
    check_owner(user, resource.owner_id())
}

pub fn check_owner(user: &User, owner_id: i64) -> Result<(), ApiError> {
    if user.id != owner_id {
        tracing::warn!("user {} attempted to modify a resource owned by {}", user.id, owner_id);
        return Err(ApiError::Forbidden);
    }
    Ok(())
}
