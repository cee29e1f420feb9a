pub mod invocation;
pub mod publish;
