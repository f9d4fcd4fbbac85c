//! Reset the password of a single admin account in a web application's users table.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod function;
pub mod logger;
pub mod password;
pub mod postgres;
pub mod reset;
pub mod ui;

pub use config::Config;
pub use db::{Account, SqliteStore, Target, UserStore};
pub use error::ResetError;
pub use password::HashScheme;
pub use reset::ResetOutcome;
