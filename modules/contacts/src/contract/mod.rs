pub mod model;

pub use model::{Contact, ContactInput, NewContact};
