/// State carried from vertex to vertex during one run
///
/// Updates are applied functionally: `apply_update` returns the next state and
/// leaves `self` alone, so a [`StepRecord`](super::StepRecord) can keep the
/// exact update each vertex produced.
pub trait WorkflowState: Clone + Send + Sync + 'static {
    /// Partial state written by one vertex
    type Update: Clone + Send + Sync + 'static;

    fn apply_update(&self, update: Self::Update) -> Self;

    /// Checked after every step; `true` stops the run as completed
    fn is_terminal(&self) -> bool {
        false
    }
}
