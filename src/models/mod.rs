pub mod citations;
pub mod class_level;
pub mod internal;
