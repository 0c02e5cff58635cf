/// Evaluation knobs. The defaults reproduce the plain language semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Print `Condition evaluated to: ...` and the statement for every `if`.
    pub trace_conditions: bool,
    /// Abort a `while` statement after this many iterations. `None` means unbounded,
    /// so a loop whose condition never turns false runs forever.
    pub max_iterations: Option<u64>,
}
