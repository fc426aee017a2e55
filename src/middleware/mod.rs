pub mod auth;
pub mod json_body;
pub mod query_params;

pub use auth::{AuthUser, MaybeAuthUser};
pub use json_body::JsonBody;
pub use query_params::QueryParams;
