pub mod init_db;
pub mod pending;
pub mod run;
