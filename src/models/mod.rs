pub mod credential;
pub mod document;
pub mod identity;
pub mod signature;
