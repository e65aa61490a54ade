pub mod checksums;
pub mod reflect;
