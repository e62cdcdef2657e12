//! Progress reporting during a fit

use crate::analysis::metrics::reduced_chi_square;
use std::time::{Duration, Instant};

/// Relative χ²ᵣ improvement that triggers a progress row
const SIGNIFICANT_CHANGE: f64 = 0.01;

/// Counts residual evaluations and logs significant χ²ᵣ improvements
#[derive(Debug, Clone, Default)]
pub struct FitProgressTracker {
    iteration: usize,
    previous_chi2: Option<f64>,
    last_chi2: Option<f64>,
    best_chi2: Option<f64>,
    best_iteration: Option<usize>,
    started: Option<Instant>,
    fitting_time: Option<Duration>,
    rows: Vec<(usize, f64, Option<f64>)>,
}

impl FitProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn start_timer(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn stop_timer(&mut self) {
        if let Some(started) = self.started.take() {
            self.fitting_time = Some(started.elapsed());
        }
    }

    /// Record one residual evaluation
    ///
    /// A row is logged on the first evaluation and whenever χ²ᵣ drops by more
    /// than 1% relative to the last logged value.
    pub fn track(&mut self, residuals: &[f64], n_free: usize) {
        self.iteration += 1;
        let Some(chi2) = reduced_chi_square(residuals, n_free) else {
            return;
        };

        match self.previous_chi2 {
            None => {
                self.previous_chi2 = Some(chi2);
                self.log_row(chi2, None);
            }
            Some(previous) if previous > 0.0 => {
                let change = (previous - chi2) / previous;
                if change > SIGNIFICANT_CHANGE {
                    self.previous_chi2 = Some(chi2);
                    self.log_row(chi2, Some(change * 100.0));
                }
            }
            Some(_) => {}
        }

        if self.best_chi2.map_or(true, |best| chi2 < best) {
            self.best_chi2 = Some(chi2);
            self.best_iteration = Some(self.iteration);
        }
        self.last_chi2 = Some(chi2);
    }

    fn log_row(&mut self, chi2: f64, improvement: Option<f64>) {
        match improvement {
            Some(percent) => tracing::info!(
                iteration = self.iteration,
                reduced_chi2 = format_args!("{chi2:.2}"),
                "χ²ᵣ improved by {percent:.1}%"
            ),
            None => tracing::info!(
                iteration = self.iteration,
                reduced_chi2 = format_args!("{chi2:.2}"),
                "Starting χ²ᵣ"
            ),
        }
        self.rows.push((self.iteration, chi2, improvement));
    }

    /// Number of residual evaluations so far
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn last_chi2(&self) -> Option<f64> {
        self.last_chi2
    }

    pub fn best_chi2(&self) -> Option<f64> {
        self.best_chi2
    }

    pub fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }

    pub fn fitting_time(&self) -> Option<Duration> {
        self.fitting_time
    }

    /// Logged rows: iteration, χ²ᵣ and improvement in percent
    pub fn rows(&self) -> &[(usize, f64, Option<f64>)] {
        &self.rows
    }
}
