pub mod blob;
pub mod health;
