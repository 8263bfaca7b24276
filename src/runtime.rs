//! Runtime object model: values, containers, classes and the operators that
//! act on them.

pub mod class;
pub mod dict;
pub mod error;
pub mod function;
pub mod ops;
pub mod sequence;
pub mod value;
