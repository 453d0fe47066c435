//! Hierarchical labelled-array container used throughout SwarmPAL.
//!
//! A [`DataTree`] maps slash-separated paths to [`Dataset`]s, where each
//! dataset holds dimensioned array variables with attributes and coordinate
//! labels. Trees can be written to and read back from a single
//! self-describing container file.

pub mod errors;
pub mod io;
pub mod model;
pub mod tree;

pub use errors::TreeError;
pub use io::{read_tree, write_tree};
pub use model::{AttrValue, Dataset, Values, Variable};
pub use tree::DataTree;
