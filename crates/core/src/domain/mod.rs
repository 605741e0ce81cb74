pub mod user_configuration;
