pub mod chat;
pub mod document;
pub mod highlight;
pub mod settings;
