pub mod alert_routes;
pub mod config_routes;
pub mod note_routes;
pub mod server_routes;
