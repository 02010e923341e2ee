mod node;
mod simd;
mod tagged_ptr;

pub use node::{CAPACITY, Node};
pub(crate) use node::FANOUT;
