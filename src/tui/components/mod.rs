pub mod input;
pub mod list;
pub mod viewer;

pub use input::*;
pub use list::*;
pub use viewer::*;
