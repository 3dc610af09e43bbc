pub mod common;

mod key_rotation;
