pub mod dispatcher;
pub mod parser;

#[cfg(test)]
pub(crate) mod fakes;

pub use dispatcher::CommandDispatcher;
