pub mod commit;
pub mod config;
pub mod dashboard;
pub mod init;
pub mod member;
pub mod session;
pub mod ui;
pub mod week;
