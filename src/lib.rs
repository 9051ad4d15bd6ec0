pub mod element;
pub mod form;
pub mod prelude;
pub mod reactive;

pub use form::{FormController, FormOptions, create_form};
