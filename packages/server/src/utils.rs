pub mod channel;
pub mod connection;
pub mod test_setup;
