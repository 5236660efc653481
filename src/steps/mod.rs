pub mod keywords;
pub mod model;
pub mod parser;
pub mod service;
