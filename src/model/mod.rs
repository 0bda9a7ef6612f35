pub use api_context::ApiContext;
pub use form::{FieldErrors, UserForm};
pub use search::{EmptyState, Listing};
pub use user::{next_user_id, CreatedUser, NewUser, User, MAX_USER_ID};

#[cfg(test)]
pub use form::{EmailError, NameError};

mod api_context;
mod form;
mod search;
mod user;
