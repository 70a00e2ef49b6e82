// src/ui/widgets/mod.rs

pub mod batch_view; // Targets with a pass/fail mark per probe.
pub mod detail_view; // Full JSON report of the selected target.
pub mod disclaimer_popup;
pub mod footer;
pub mod input;
pub mod summary;
