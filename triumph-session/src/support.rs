/// The in-app support widget. Told who the user is once the session is prepared.
pub trait SupportWidget: Send + Sync {
    fn identify(&self, user_id: &str);
}
