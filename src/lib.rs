pub mod config;
pub mod connection;
pub mod exception;
pub mod handler;
pub mod param;
pub mod request;
pub mod resolver;
pub mod response;
pub mod server;

pub use config::Config;
pub use connection::{ConnState, Connection};
pub use exception::Exception;
pub use param::{HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use resolver::{resolve, Resolved};
pub use response::Response;
pub use server::Server;
