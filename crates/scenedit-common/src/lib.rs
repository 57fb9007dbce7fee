pub mod error;
pub mod id;
pub mod schema;
pub mod value;

pub use error::*;
pub use id::*;
pub use schema::*;
pub use value::*;
