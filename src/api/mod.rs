/*
 * Responsibility
 * - HTTP の入口 (routes() の re-export など)
 */
pub mod dto;
pub mod handlers;
mod routes;

pub use routes::routes;
