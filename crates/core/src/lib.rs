pub mod error;
pub mod mapper;
pub mod models;
pub mod title;
pub mod traits;

pub use error::*;
pub use mapper::*;
pub use models::*;
pub use title::*;
pub use traits::*;
