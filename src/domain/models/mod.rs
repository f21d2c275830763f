pub mod audit;
pub mod auth;
pub mod client_user;
pub mod membership;
pub mod order;
pub mod tenant;
pub mod user;
