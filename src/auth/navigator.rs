use std::sync::Mutex;

/// The UI seam the client uses to send the user back to the login screen.
pub trait Navigator: Send + Sync {
    /// Route the user is currently on, e.g. `/articles/42`.
    fn current_route(&self) -> String;
    fn redirect(&self, route: &str);
}

/// Navigator for headless use; it never moves.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn current_route(&self) -> String {
        String::new()
    }

    fn redirect(&self, route: &str) {
        tracing::debug!(route, "Redirect requested without a navigator");
    }
}

/// In-memory navigator that tracks the current route and every redirect.
#[derive(Debug, Default)]
pub struct RouteTracker {
    current: Mutex<String>,
    redirects: Mutex<Vec<String>>,
}

impl RouteTracker {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            current: Mutex::new(initial.into()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    pub fn visit(&self, route: impl Into<String>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = route.into();
    }

    /// Redirects issued so far, oldest first.
    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Navigator for RouteTracker {
    fn current_route(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn redirect(&self, route: &str) {
        self.visit(route);
        self.redirects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(route.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_tracker_records_redirects() {
        let nav = RouteTracker::new("/articles");
        nav.redirect("/login");
        assert_eq!(nav.current_route(), "/login");
        assert_eq!(nav.redirects(), vec!["/login".to_string()]);
    }
}
