pub mod catalog;
pub mod identity;
pub mod partner;
pub mod quote;
