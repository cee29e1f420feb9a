pub mod callback;
pub mod object_store;
