//! ui::notifier
//!
//! Delivers sign-in notices to the terminal.

use crate::routing::Notifier;
use crate::session::Notice;

/// Prints notices to stderr. A notice means resolution was aborted, so it is
/// shown even under `--quiet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier {
    /// Append the notice kind, for `--debug` runs.
    tagged: bool,
}

impl ConsoleNotifier {
    pub fn new(tagged: bool) -> Self {
        Self { tagged }
    }

    fn render(&self, notice: Notice) -> String {
        if self.tagged {
            format!("notice: {} ({:?})", notice, notice)
        } else {
            format!("notice: {}", notice)
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        tracing::debug!(?notice, "delivering notice");
        eprintln!("{}", self.render(notice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_render_names_the_kind() {
        let text = ConsoleNotifier::new(true).render(Notice::CheckConnection);
        assert!(text.contains("CheckConnection"));
        assert!(text.contains("check your connection"));
    }

    #[test]
    fn plain_render_is_message_only() {
        let text = ConsoleNotifier::default().render(Notice::AuthenticationFailed);
        assert_eq!(text, format!("notice: {}", Notice::AuthenticationFailed.message()));
    }
}
