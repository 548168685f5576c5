//! Record plumbing shared by the back-office: typed ids, record metadata and
//! the storage seam to the REST backend.

pub mod documents;
pub mod ids;
pub mod memory;
pub mod persistence;
pub mod rest;
