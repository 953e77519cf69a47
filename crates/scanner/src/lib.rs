pub mod matcher;
pub mod nfo;
pub mod scan;
pub mod walk;
pub mod xml;
