pub mod admin;
pub mod auth;
pub mod db;
pub mod maybe_auth;
pub mod membership;
pub mod portal;
pub mod request_meta;
pub mod tenant;
