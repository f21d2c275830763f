pub mod factory;
pub mod gateway;
pub mod repositories;
