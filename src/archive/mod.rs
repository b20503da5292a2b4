pub(crate) mod remote;
pub(crate) mod store;
pub(crate) mod writer;
