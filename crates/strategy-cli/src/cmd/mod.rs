pub mod categories;
pub mod config;
pub mod doc;
pub mod export;
pub mod idea;
pub mod project;
pub mod serve;
pub mod suggest;
