use super::{round2, TimingSummary};

#[test]
fn fixed_timings_give_known_statistics() {
    let summary = TimingSummary::from_samples(&[10.0, 20.0, 30.0]);

    assert_eq!(summary.avg_ms, 20.0);
    assert_eq!(summary.min_ms, 10.0);
    assert_eq!(summary.max_ms, 30.0);
    // population standard deviation of [10, 20, 30] is sqrt(200/3) = 8.165
    assert_eq!(summary.std_dev_ms, 8.16);
}

#[test]
fn single_sample_has_no_spread() {
    let summary = TimingSummary::from_samples(&[12.5]);

    assert_eq!(summary.avg_ms, 12.5);
    assert_eq!(summary.min_ms, 12.5);
    assert_eq!(summary.max_ms, 12.5);
    assert_eq!(summary.std_dev_ms, 0.0);
}

#[test]
fn empty_samples_summarize_to_zero() {
    let summary = TimingSummary::from_samples(&[]);

    assert_eq!(summary.avg_ms, 0.0);
    assert_eq!(summary.std_dev_ms, 0.0);
}

#[test]
fn rounding_is_to_two_decimals() {
    assert_eq!(round2(8.164_97), 8.16);
    assert_eq!(round2(33.333_333), 33.33);
    assert_eq!(round2(-33.335_1), -33.34);
    assert_eq!(round2(50.0), 50.0);
}
