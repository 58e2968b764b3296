pub mod alarm;
pub mod cli;
pub mod io;
pub mod model;
pub mod notification;
pub mod ops;
pub mod util;

#[cfg(test)]
pub(crate) mod test_helpers;
