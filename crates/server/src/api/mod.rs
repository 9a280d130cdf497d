pub mod audit;
pub mod error;
pub mod handlers;
pub mod knowledge;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod settings;
pub mod tickets;
pub mod users;

pub use routes::create_router;
