//! Intcode VM: a stored-program integer machine with cooperative scheduling.
//!
//! The [`vm::VM`] executes one program image with its own memory and I/O
//! channel. [`scheduler`] builds the three driving disciplines on top of it:
//! run-to-halt, chained pipelines and a flat packet network.

pub mod decode;
pub mod io;
pub mod memory;
pub mod program;
pub mod scheduler;
pub mod snapshot;
pub mod values;
pub mod vm;

pub use program::{Program, ProgramError};
pub use values::Word;
pub use vm::{RunResult, Status, VmConfig, VmError, VM};
