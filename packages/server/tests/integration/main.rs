mod common;

mod blob;
mod health;
