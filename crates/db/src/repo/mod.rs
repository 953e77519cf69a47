pub mod custom_fields;
pub mod directories;
pub mod movies;
pub mod settings;
pub mod tags;
