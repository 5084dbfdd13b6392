//! Storage operations, one module per entity. Reads go through the
//! tolerant row layer in `db::raw`; writes target canonical columns.

pub mod activities;
pub mod activity_categories;
pub mod admin_logs;
pub mod inquiries;
pub mod products;
pub mod sections;
pub mod technologies;
