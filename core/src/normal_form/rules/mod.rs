//! Normal-form Rules
//!
//! Each file in this module contains one rule:
//!
//! - `call_position.rs` - Applications only as a statement's whole value
//! - `atomic_operands.rs` - Operands are names or literals
//! - `canonical_loop.rs` - Loops are labeled `while` statements
//! - `reserved.rs` - `$` names and instrumentation nodes stay out of input

mod atomic_operands;
mod call_position;
mod canonical_loop;
mod reserved;

pub use atomic_operands::AtomicOperandsRule;
pub use call_position::CallPositionRule;
pub use canonical_loop::CanonicalLoopRule;
pub use reserved::ReservedRule;
