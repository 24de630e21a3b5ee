pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod goal;
pub mod instruction;
pub mod machine;
pub mod plugin;
pub mod pool;
pub mod program;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use goal::{Argument, Feature, Features, Goal, Outlink};
pub use instruction::Instruction;
pub use machine::Machine;
pub use plugin::{FactsPlugin, Plugin};
pub use pool::{Pool, SymbolTable};
pub use program::Program;
pub use state::{CallFrame, HeapCell, MutableState, State};

// Warren Abstract Machine, flattened to constants only, that accumulates
// features while it proves.

// Constant, represented as an interned string id in the symbol table.
pub type Atom = u32;
// Absolute heap or program address.
pub type Addr = usize;
// Register, addressed relative to the top of the register stack: -1, -2, ...
pub type Reg = i32;
// Heap position relative to the current heap top: -1, -2, ...
pub type Offset = i32;
