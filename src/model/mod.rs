pub mod attendance;
pub mod badge;
pub mod department;
pub mod role;
pub mod user;
