pub mod csv;
pub mod excel;
pub mod json;
pub mod text;
