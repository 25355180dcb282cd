pub mod cost_items;
pub mod currency;
pub mod margin;
pub mod sentinel;
pub mod templates;
pub mod validation;
