//! Source layers of the tiled world and the topmost-wins tile resolver.

pub mod descriptor;
pub mod error;
pub mod layer;
pub mod registry;
pub mod resolver;

pub use descriptor::*;
pub use error::*;
pub use layer::*;
pub use registry::*;
pub use resolver::*;
