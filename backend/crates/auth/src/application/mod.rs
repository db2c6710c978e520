//! Application Layer
//!
//! Use cases and application services.

pub mod account_directory;
pub mod check_session;
pub mod config;
pub mod delete_account;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod session_manager;

// Re-exports
pub use account_directory::{AccountDirectory, RegisterInput};
pub use check_session::CheckSessionUseCase;
pub use config::AuthConfig;
pub use delete_account::DeleteAccountUseCase;
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use refresh::{RefreshOutput, RefreshUseCase};
pub use session_manager::SessionManager;
