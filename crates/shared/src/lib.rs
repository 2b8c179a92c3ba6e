//! Request and response types shared by the Memora API and its clients.

pub mod api;
