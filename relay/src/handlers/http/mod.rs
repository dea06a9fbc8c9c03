pub mod health;
pub mod routes;
pub mod space;
pub mod utils;
