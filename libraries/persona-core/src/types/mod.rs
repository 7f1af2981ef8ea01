mod ids;
mod user;

pub use ids::UserId;
pub use user::{CreateUser, PasswordUpdate, PasswordUpdated, User};
