use shared::domain::ExerciseKind;

/// Transition a controller asks the host router to perform. Resolving these
/// to concrete screens is the router's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationRequest {
    EntriesList(ExerciseKind),
    ExercisesMenu,
    BackOneStep,
}
