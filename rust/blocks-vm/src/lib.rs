//! Blocks VM: threaded-code compute kernels over four-lane SIMD registers.
//!
//! Kernels are assembled with a [`Builder`] into straight-line instruction
//! sequences, finalized into immutable, position-independent [`Program`]s,
//! and run over arrays [`K`] lanes at a time by an [`Executor`]. Programs
//! can call other finalized programs, so small kernels compose into larger
//! ones.
//!
//! ```
//! use blocks_vm::{execute, Program, SideTable};
//!
//! let add = Program::build(|mut b| {
//!     let (x, y) = (b.arg(0), b.arg(1));
//!     let sum = b.fadd(x, y);
//!     b.ret(sum)
//! });
//! let double = Program::build(|mut b| {
//!     let v = b.load_varying(1);
//!     let nil = b.nil();
//!     let r = b.call(&add, v, v, nil, nil);
//!     b.store_varying(0, r.x);
//!     b.ret(nil)
//! });
//!
//! let input = [1.0f32, 2.0, 3.0, 4.0, 5.0];
//! let mut output = [0.0f32; 5];
//! let mut table = SideTable::new().write(&mut output[..]).read(&input[..]);
//! execute(&double, input.len(), &mut table).unwrap();
//! drop(table);
//! assert_eq!(output, [2.0, 4.0, 6.0, 8.0, 10.0]);
//! ```
#![warn(clippy::all)]

pub mod binding;
pub mod builder;
pub mod error;
pub mod exec;
mod finalize;
pub mod frame;
pub mod inst;
pub mod lanes;
pub mod program;
mod stages;
pub mod value;

pub use binding::{Binding, BindingUse, Bindings, Scalar, SideTable};
pub use builder::Builder;
pub use error::ExecError;
pub use exec::{execute, ExecConfig, Executor};
pub use frame::{ArenaStats, INLINE_SLOTS, SCRATCH_BYTES};
pub use inst::{Imm, Inst, Op};
pub use lanes::{Lanes, K};
pub use program::Program;
pub use value::{Val, Val4, ARGS, RESERVED, RETURNS};
