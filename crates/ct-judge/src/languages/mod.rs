//! Built-in language runners.

pub mod cpp;
pub mod java;
pub mod kotlin;
pub mod python;

pub use cpp::CppRunner;
pub use java::JavaRunner;
pub use kotlin::KotlinRunner;
pub use python::PythonRunner;
