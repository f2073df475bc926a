pub mod application;
pub mod auth;
pub mod job;
pub mod profile;

pub use application::Application;
pub use auth::{Credentials, RegisterRequest};
pub use job::JobListing;
pub use profile::{Profile, ProfileUpdate, Skill};
