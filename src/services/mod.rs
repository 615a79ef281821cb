pub mod auth_service;
pub mod notes_service;
