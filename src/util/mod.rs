pub(crate) mod byte_size;
pub(crate) mod cmd;
pub(crate) mod duration;
pub(crate) mod error;
pub(crate) mod path;
