use fp_core::config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOptions {
    /// Emit a warning when a literal `div`/`rem` by zero keeps its receiver.
    pub report_division_by_zero: bool,
    /// Worker threads used by [`crate::driver::finalize_trees`].
    pub threads: usize,
}

impl Default for FinalizeOptions {
    fn default() -> Self {
        Self {
            report_division_by_zero: config::report_const_division_by_zero(),
            threads: config::finalize_threads(),
        }
    }
}

impl FinalizeOptions {
    pub fn with_report_division_by_zero(mut self, report: bool) -> Self {
        self.report_division_by_zero = report;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }
}
