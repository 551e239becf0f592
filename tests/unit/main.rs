//! Unit test harness for the public crate API.

mod gatt_parser_test;
mod metrics_test;
mod tcx_export_test;
