//! Machine errors
//!
//! Everything here is an internal-consistency violation: the compiled
//! program or a plugin broke the machine's contract. A clause that simply
//! does not apply is not an error; it leaves the state `failed`.

use thiserror::Error;

use crate::{Addr, Atom, Offset, Reg};

/// Machine result type
pub type Result<T> = std::result::Result<T, Error>;

/// Machine errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown predicate {0}")]
    UnknownPredicate(String),

    #[error("expected a free cell at {addr} in {operation}")]
    NotFree { addr: Addr, operation: &'static str },

    #[error("cell {addr} is neither free nor constant in {operation}")]
    NeitherFreeNorConstant { addr: Addr, operation: &'static str },

    #[error("expected a constant at {addr} in {operation}")]
    NotConstant { addr: Addr, operation: &'static str },

    #[error("register {0} must be negative and within the register stack")]
    InvalidRegister(Reg),

    #[error("register {0} read before it was set")]
    UnsetRegister(Reg),

    #[error("relative heap index {offset} is invalid for a heap of size {heap_size}")]
    InvalidHeapOffset { offset: Offset, heap_size: usize },

    #[error("heap address {addr} out of range (heap size {heap_size})")]
    HeapOutOfRange { addr: Addr, heap_size: usize },

    #[error("no instruction at program address {0}")]
    InvalidAddress(Addr),

    #[error("argument {index} of an arity-{arity} call is out of range")]
    InvalidArgument { arity: usize, index: usize },

    #[error("{0} with an empty feature stack")]
    EmptyFeatureStack(&'static str),

    #[error("depth bound {0} exceeded in feature computation")]
    FindallDepthExceeded(usize),

    #[error("malformed call label {0:?}")]
    MalformedLabel(String),

    #[error("no symbol for constant id {0}")]
    UnknownSymbol(Atom),

    #[error("state is paused without a jump target")]
    NoJumpTarget,

    #[error("feature variable {0} is not bound by the rule head")]
    UnboundFeatureVariable(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}
