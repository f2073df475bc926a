//! Session & profile client for the Fursa job portal API.

pub mod api_client;
pub mod config;
pub mod errors;
pub mod models;
pub mod session;

pub use api_client::{Attachment, FursaClient, RequestBody};
pub use config::{Config, LoginField};
pub use errors::{ClientError, Notification};
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
