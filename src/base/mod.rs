//! Small generic data-structure helpers shared by the WPO builder.

pub mod dsu;

pub use dsu::DSU;
