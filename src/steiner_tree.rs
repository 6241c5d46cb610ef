pub mod closure;
pub mod dreyfus_wagner;
pub mod kernel;
pub mod tree;
