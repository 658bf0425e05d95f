pub use super::orders::Entity as Orders;
pub use super::products::Entity as Products;
pub use super::revoked_tokens::Entity as RevokedTokens;
pub use super::users::Entity as Users;
