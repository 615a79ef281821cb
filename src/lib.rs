pub mod alerting;
pub mod models;
pub mod notifications;
pub mod providers;
pub mod remote_config;
pub mod server;
pub mod services;
pub mod web;
