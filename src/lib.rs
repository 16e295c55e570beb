#[macro_use]
extern crate lazy_static;

pub mod compositor;
pub mod config;
pub mod dashboard;
pub mod driver;
pub mod layout;
pub mod render;
pub mod renders;
pub mod scheduler;
pub mod sources;
