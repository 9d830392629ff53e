//! Sea-ORM entities for parentline-store

pub mod messages;
pub mod students;

pub use messages::Entity as Message;
pub use students::Entity as Student;
