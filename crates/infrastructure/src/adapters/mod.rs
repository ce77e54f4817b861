//! Adapters implementing application ports

mod portal_adapter;

pub use portal_adapter::PortalScheduleAdapter;
