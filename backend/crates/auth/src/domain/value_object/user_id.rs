use kernel::id::Id;

/// Marker for storage keys of the `users` table
pub struct UserMarker;
pub type UserId = Id<UserMarker>;
