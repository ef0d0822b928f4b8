//! Property tests for timecode arithmetic across every frame-rate profile

use markersync::core::timecode::{FrameRate, FrameRateProfile, Timecode, TimecodeError, TimecodeField};
use proptest::prelude::*;

fn all_profiles() -> Vec<FrameRateProfile> {
    let mut profiles: Vec<_> = FrameRate::ALL.iter().map(|&r| FrameRateProfile::non_drop(r)).collect();
    for rate in FrameRate::ALL.iter().filter(|r| r.supports_drop_frame()) {
        profiles.push(FrameRateProfile::new(*rate, true).expect("drop-frame rate"));
    }
    profiles
}

fn profile() -> impl Strategy<Value = FrameRateProfile> {
    prop::sample::select(all_profiles())
}

/// A profile with two frame counts inside one day of it
fn profile_and_frames() -> impl Strategy<Value = (FrameRateProfile, u64, u64)> {
    profile().prop_flat_map(|p| {
        let day = p.frames_per_day();
        (Just(p), 0..day, 0..day)
    })
}

proptest! {
    /// Frame count → label → frame count is the identity within a day
    #[test]
    fn frame_count_roundtrip((p, n, _) in profile_and_frames()) {
        let conv = Timecode::from_frame_count(n, p);
        prop_assert_eq!(conv.day_overflow, 0);
        prop_assert_eq!(conv.timecode.to_frame_count(), n);
    }

    /// Drop-frame counting never lands on a skipped label
    #[test]
    fn never_emits_dropped_labels((p, n, _) in profile_and_frames()) {
        let tc = Timecode::from_frame_count(n, p).timecode;
        prop_assert!(!tc.is_dropped_label(), "{} at {}", tc, p);
    }

    /// Formatting then parsing gives back the same timecode
    #[test]
    fn format_parse_roundtrip((p, n, _) in profile_and_frames()) {
        let tc = Timecode::from_frame_count(n, p).timecode;
        let text = tc.format();
        prop_assert_eq!(text.len(), 11);
        prop_assert_eq!(Timecode::parse(&text, p).unwrap(), tc);
    }

    /// Addition is frame addition modulo one day
    #[test]
    fn add_wraps_modulo_day((p, a, b) in profile_and_frames()) {
        let day = p.frames_per_day();
        let lhs = Timecode::from_frame_count(a, p).timecode;
        let rhs = Timecode::from_frame_count(b, p).timecode;

        let sum = lhs.add(&rhs).unwrap();
        prop_assert_eq!(sum.result.to_frame_count(), (a + b) % day);
        prop_assert_eq!(sum.day_overflow, (a + b) / day);
        prop_assert_eq!(sum.result, rhs.add(&lhs).unwrap().result);
    }

    /// Offsetting the start by the duration lands on the end
    #[test]
    fn duration_inverts_offset((p, a, b) in profile_and_frames()) {
        let start = Timecode::from_frame_count(a, p).timecode;
        let end = Timecode::from_frame_count(b, p).timecode;

        let span = Timecode::duration(&start, &end).unwrap();
        prop_assert_eq!(span.crosses_midnight, b < a);
        prop_assert!(span.frames < p.frames_per_day());
        prop_assert_eq!(start.offset_frames(span.frames).unwrap().timecode, end);
        prop_assert_eq!(span.duration.to_frame_count(), span.frames);
    }

    /// Any field past its bound is named in the error
    #[test]
    fn out_of_range_fields_are_cited(
        p in profile(),
        h in 0u32..40,
        m in 0u32..80,
        s in 0u32..80,
        f in 0u32..70,
    ) {
        let text = format!("{h:02}:{m:02}:{s:02}:{f:02}");
        let mut expected = Vec::new();
        if h > 23 { expected.push(TimecodeField::Hours); }
        if m > 59 { expected.push(TimecodeField::Minutes); }
        if s > 59 { expected.push(TimecodeField::Seconds); }
        if f >= p.integer_fps() { expected.push(TimecodeField::Frames); }
        // Drop-frame skips ;00 and ;01 (four labels at 59.94) outside tenth minutes
        let dropped = if p.drop_frame() { p.integer_fps() / 15 } else { 0 };
        if expected.is_empty() && s == 0 && m % 10 != 0 && f < dropped {
            expected.push(TimecodeField::Frames);
        }

        match Timecode::parse(&text, p) {
            Ok(tc) => {
                prop_assert!(expected.is_empty());
                prop_assert_eq!(tc.format(), text);
            }
            Err(e) => prop_assert_eq!(e.violated_fields(), expected),
        }
    }
}

#[test]
fn hours_and_minutes_both_reported() {
    // Given a timecode with two bad fields
    let p = FrameRateProfile::default();

    // When parsing
    let err = Timecode::parse("25:61:00:00", p).unwrap_err();

    // Then both fields are cited and nothing is clamped
    assert!(matches!(err, TimecodeError::InvalidRange { .. }));
    assert_eq!(err.violated_fields(), vec![TimecodeField::Hours, TimecodeField::Minutes]);
    let message = err.to_string();
    assert!(message.contains("hours 25"), "{message}");
    assert!(message.contains("minutes 61"), "{message}");
}

#[test]
fn drop_frame_minute_boundaries() {
    let df = FrameRateProfile::new(FrameRate::Fps29_97, true).unwrap();

    // First frame after 00:00:59:29 skips ;00 and ;01
    let before = Timecode::parse("00:00:59;29", df).unwrap();
    assert_eq!(before.offset_frames(1).unwrap().timecode.format(), "00:01:00:02");

    // Tenth minutes keep every label
    let tenth = Timecode::parse("00:10:00;00", df).unwrap();
    assert_eq!(tenth.to_frame_count(), 17_982);
    assert!(!tenth.is_dropped_label());

    // One hour of drop-frame is 107892 frames
    let hour = Timecode::parse("01:00:00;00", df).unwrap();
    assert_eq!(hour.to_frame_count(), 107_892);

    // 59.94 drops four labels per minute
    let df60 = FrameRateProfile::new(FrameRate::Fps59_94, true).unwrap();
    let before = Timecode::parse("00:00:59;59", df60).unwrap();
    assert_eq!(before.offset_frames(1).unwrap().timecode.format(), "00:01:00:04");
}

#[test]
fn dropped_labels_are_rejected() {
    let df = FrameRateProfile::new(FrameRate::Fps29_97, true).unwrap();

    // ;00 and ;01 never exist at the start of minute one
    for label in ["00:01:00;00", "00:01:00;01", "01:59:00;00"] {
        let err = Timecode::parse(label, df).unwrap_err();
        assert_eq!(err.violated_fields(), vec![TimecodeField::Frames], "{label}");
        assert!(err.to_string().contains("dropped label"), "{err}");
    }
    assert!(Timecode::parse("00:01:00;02", df).is_ok());
    assert!(Timecode::parse("00:20:00;00", df).is_ok());

    // Same labels are fine without drop-frame counting
    let ndf = FrameRateProfile::new(FrameRate::Fps29_97, false).unwrap();
    assert!(Timecode::parse("00:01:00:00", ndf).is_ok());

    // 59.94 also rejects ;02 and ;03
    let df60 = FrameRateProfile::new(FrameRate::Fps59_94, true).unwrap();
    assert!(Timecode::parse("00:01:00;03", df60).is_err());
    assert!(Timecode::parse("00:01:00;04", df60).is_ok());
}

#[test]
fn mixed_profiles_are_rejected() {
    let a = Timecode::parse("00:00:01:00", FrameRateProfile::non_drop(FrameRate::Fps25)).unwrap();
    let b = Timecode::parse("00:00:01:00", FrameRateProfile::non_drop(FrameRate::Fps30)).unwrap();

    assert!(matches!(a.add(&b), Err(TimecodeError::ProfileMismatch { .. })));
    assert!(matches!(Timecode::duration(&a, &b), Err(TimecodeError::ProfileMismatch { .. })));
    assert!(a.same_label(&b));
}
