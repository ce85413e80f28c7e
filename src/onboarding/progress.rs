//! Step to completion fraction and display label.

use super::state::Step;

/// Number of steps after Welcome.
pub const TOTAL_STEPS: usize = 6;

/// Completion fraction for `step`, in `[0.0, 1.0]`.
///
/// Welcome is 0.0, UploadId is 1/6 and each later step adds another sixth
/// up to Complete at 1.0.
pub fn progress_fraction(step: Step) -> f32 {
    step.ordinal() as f32 / TOTAL_STEPS as f32
}

/// "Step N of 6" for every step after Welcome.
pub fn step_label(step: Step) -> String {
    match step {
        Step::Welcome => "Getting started".to_string(),
        other => format!("Step {} of {}", other.ordinal(), TOTAL_STEPS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        assert_eq!(progress_fraction(Step::Welcome), 0.0);
        assert_eq!(progress_fraction(Step::Complete), 1.0);
    }

    #[test]
    fn strictly_increasing_in_forward_order() {
        for pair in Step::ALL.windows(2) {
            assert!(
                progress_fraction(pair[0]) < progress_fraction(pair[1]),
                "{} should be below {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn within_unit_interval() {
        for step in Step::ALL {
            let f = progress_fraction(step);
            assert!((0.0..=1.0).contains(&f), "{step} -> {f}");
        }
    }

    #[test]
    fn labels() {
        assert_eq!(step_label(Step::Welcome), "Getting started");
        assert_eq!(step_label(Step::UploadId), "Step 1 of 6");
        assert_eq!(step_label(Step::ConfirmPin), "Step 5 of 6");
        assert_eq!(step_label(Step::Complete), "Step 6 of 6");
    }
}
