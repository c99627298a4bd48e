pub mod catalog;
pub mod form;
