pub mod config;
pub mod extract;
pub mod flatten;
pub mod markup;
pub mod pipeline;
pub mod server;
pub mod table;
pub mod workbook;
