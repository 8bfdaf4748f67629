pub mod api;
pub mod config;
pub mod page;
pub mod stream;
pub mod survey;
