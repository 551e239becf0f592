//! Integration test harness: full ride scenarios through the public API.

mod ride_recording_test;
mod workout_execution_test;
