pub mod canonicalize;
pub mod digest;
pub mod domain;
pub mod schema;
