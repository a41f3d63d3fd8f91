//! Code generation: Python 3.10+ emission from the analyzed tree.

pub mod python;

pub use python::PyCodeGen;
