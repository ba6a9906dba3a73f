#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod batch;
pub mod index;
pub mod io;
pub mod matrix;
pub mod samples;
pub mod types;
