pub mod handlers;
pub mod routes;
pub mod torrents;

pub use routes::create_router;
