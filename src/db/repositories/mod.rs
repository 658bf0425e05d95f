pub mod order;
pub mod product;
pub mod token;
pub mod user;
