//! COS object model
//!
//! Values are plain data. Indirect objects live in an arena keyed by [`ObjectId`]
//! (see [`crate::parser::PdfReader`]) and reference each other through
//! [`Object::Reference`], never through owning links.

mod dictionary;
mod name;
mod primitive;
mod stream;
mod string;

pub use dictionary::Dictionary;
pub use name::Name;
pub use primitive::{Object, ObjectId};
pub use stream::{PayloadState, Stream};
pub use string::PdfString;
