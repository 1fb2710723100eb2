// Library interface for perception modules
// This allows tests and the admin binaries to import modules

pub mod admin;
pub mod gate;
pub mod identity;
pub mod login;
pub mod routes;
pub mod seed;
pub mod server;
pub mod store;
pub mod views;
