//! Session seam
//!
//! The auth service only needs one slot of the request's session: the id
//! of the signed-in user. Whatever session type the web layer uses
//! implements this trait.

use crate::domain::value_object::user_id::UserId;

pub trait UserSession: Send + Sync {
    /// The signed-in user's id, if any
    fn user_id(&self) -> Option<UserId>;

    fn set_user_id(&mut self, id: UserId);

    fn clear_user_id(&mut self);
}
