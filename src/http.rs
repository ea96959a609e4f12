// The request/response pipeline and the single-threaded socket server.
pub mod pipeline;
pub mod request;
pub mod routes;
pub mod server;
pub mod views;
