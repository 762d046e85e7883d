//! Shaping elements into data trees

pub mod engine;
pub mod transformer;

pub use engine::{DataTree, Node, Transformed, TreeData, transform};
pub use transformer::{
    Attributes, ElementTransformer, FnTransformer, Transformer, TransformerRegistry,
};
