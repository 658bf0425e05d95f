pub mod prelude;

pub mod orders;
pub mod products;
pub mod revoked_tokens;
pub mod users;
