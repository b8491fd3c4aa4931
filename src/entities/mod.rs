// ABOUTME: SeaORM entities module for database models
// ABOUTME: Exports the cession record entity

pub mod cession;

pub use cession::Entity as Cession;
