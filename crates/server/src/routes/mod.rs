pub mod account;
pub mod auth;
pub mod dataexport;
pub mod health;
pub mod pages;
