use std::time::{Duration, Instant};

use serde::Serialize;

/// How long a success or error toast stays up.
pub const TOAST_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Toast {
    Hidden,
    Showing { message: String, kind: ToastKind },
}

impl Toast {
    pub fn loading(message: impl Into<String>) -> Self {
        Self::Showing {
            message: message.into(),
            kind: ToastKind::Loading,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::Showing {
            message: message.into(),
            kind: ToastKind::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Showing {
            message: message.into(),
            kind: ToastKind::Error,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Toast::Hidden => None,
            Toast::Showing { message, .. } => Some(message),
        }
    }

    pub fn kind(&self) -> Option<ToastKind> {
        match self {
            Toast::Hidden => None,
            Toast::Showing { kind, .. } => Some(*kind),
        }
    }
}

/// The single toast slot. A new toast replaces the current one; loading
/// toasts stay until replaced.
#[derive(Debug, Clone)]
pub struct ToastState {
    current: Toast,
    shown_at: Option<Instant>,
}

impl Default for ToastState {
    fn default() -> Self {
        Self {
            current: Toast::Hidden,
            shown_at: None,
        }
    }
}

impl ToastState {
    pub fn current(&self) -> &Toast {
        &self.current
    }

    pub fn show(&mut self, toast: Toast) {
        self.show_at(toast, Instant::now());
    }

    pub fn show_at(&mut self, toast: Toast, now: Instant) {
        self.shown_at = match toast {
            Toast::Hidden => None,
            _ => Some(now),
        };
        self.current = toast;
    }

    pub fn hide(&mut self) {
        self.current = Toast::Hidden;
        self.shown_at = None;
    }

    /// Hides an expired toast. Returns true when the state changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let expired = match (&self.current, self.shown_at) {
            (Toast::Showing { kind, .. }, Some(shown_at)) => {
                *kind != ToastKind::Loading && now.duration_since(shown_at) >= TOAST_TTL
            }
            _ => false,
        };
        if expired {
            self.hide();
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_toast_expires() {
        let start = Instant::now();
        let mut state = ToastState::default();
        state.show_at(Toast::success("Download complete!"), start);
        assert!(!state.tick(start + Duration::from_secs(2)));
        assert_eq!(state.current().message(), Some("Download complete!"));
        assert!(state.tick(start + TOAST_TTL));
        assert_eq!(state.current(), &Toast::Hidden);
    }

    #[test]
    fn loading_toast_waits_for_replacement() {
        let start = Instant::now();
        let mut state = ToastState::default();
        state.show_at(Toast::loading("Downloading \"CEO Bars\"..."), start);
        assert!(!state.tick(start + Duration::from_secs(60)));
        state.show_at(Toast::error("Download failed. Please try again."), start + Duration::from_secs(61));
        assert_eq!(state.current().kind(), Some(ToastKind::Error));
        assert!(state.tick(start + Duration::from_secs(64)));
    }
}
