//! Component 4 – writers. Each one takes the processed project and
//! drops its artifact into the output directory.
pub mod bin;
pub mod lua;
