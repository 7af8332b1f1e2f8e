pub mod builder;
pub mod pool;
pub mod statement;
