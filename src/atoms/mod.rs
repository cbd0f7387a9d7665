pub mod composition;
pub mod element;
mod formula;
mod mass;
