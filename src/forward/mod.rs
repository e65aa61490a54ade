pub mod frame;
pub mod reflect_loop;
pub mod transport;
