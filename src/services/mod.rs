pub mod auth;
pub use auth::{AuthError, AuthService, TokenPair};

pub mod orders;
pub use orders::{OrderError, OrderItemInput, OrderService};

pub mod image;
pub use image::ImageService;
