//! Selection change notifications.

/// Receives a notification whenever the tracked character changes.
///
/// Used to reset rolling display windows so totals from the previous
/// character don't bleed into the new one.
pub trait SelectionObserver: Send {
    /// Called after the output source switched to `character`.
    fn selection_changed(&mut self, character: &str);
}

impl<F> SelectionObserver for F
where
    F: FnMut(&str) + Send,
{
    fn selection_changed(&mut self, character: &str) {
        self(character);
    }
}
