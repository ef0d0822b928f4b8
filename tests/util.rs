//! Shared test utilities for integration tests
//!
//! Provides a temp workspace holding a small review export and an
//! existing-markers file, used by the CLI tests.

use assert_fs::prelude::*;

/// Review export with two main comments and one reply
pub const REVIEW_EXPORT: &str = "\
Review export - Project Falcon

001 - Jane - 1:00PM Jan 1, 2025
00:01:00:00 - VO in
  John - 1:05PM Jan 1, 2025
  Agreed
002 - Mia - 1:10PM Jan 1, 2025
00:02:00:00 - Music swells
";

/// Temp directory with `review.txt` and `markers.json`.
/// `markers` is the JSON body of the markers file.
pub fn make_review_fixture(markers: &str) -> assert_fs::TempDir
{
    // Initialize the temporary workspace root
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    // The export every command reads
    tmp.child("review.txt")
        .write_str(REVIEW_EXPORT)
        .expect("write export");

    // Markers already on the timeline
    tmp.child("markers.json")
        .write_str(markers)
        .expect("write markers");

    // Return the prepared directory to the caller
    tmp
}
