//! Presentation callbacks invoked by the controller.

use oxvgui_core::{CompressionMode, Dimensions, ResultValue, Settings};
use tokio::sync::mpsc;

use crate::Failure;

/// A document ready to be shown, with its sizes in the chosen mode.
#[derive(Debug, Clone)]
pub struct Presentation {
    pub value: ResultValue,
    /// Name of the loaded input file.
    pub filename: String,
    pub mode: CompressionMode,
    /// Size of `value`.
    pub size: usize,
    /// Size of the original document, when `value` is a computed result.
    pub comparison_size: Option<usize>,
}

impl Presentation {
    /// Percentage of the original size saved by this result.
    pub fn savings_percent(&self) -> Option<f64> {
        self.comparison_size
            .filter(|&original| original > 0)
            .map(|original| (1.0 - self.size as f64 / original as f64) * 100.0)
    }
}

/// Receives everything the controller wants to show.
///
/// Calls are made from the controller task and should return quickly.
pub trait Presenter: Send + Sync + 'static {
    /// An optimized result for the current settings is ready.
    fn on_result_ready(&self, presentation: &Presentation);

    /// The original document is shown instead of an optimized one.
    fn on_original_ready(&self, presentation: &Presentation);

    /// Something failed in a way the user should see.
    fn on_error(&self, failure: &Failure);

    /// An optimization started or stopped.
    fn on_busy(&self, _busy: bool) {}

    /// A new document was accepted.
    fn on_input_loaded(&self, _filename: &str, _dimensions: Dimensions) {}

    /// Settings were restored from the store on startup.
    fn on_settings_restored(&self, _settings: &Settings) {}

    /// Settings were reset; `previous` allows undoing it.
    fn on_settings_reset(&self, _previous: &Settings) {}

    /// The application version differs from the one seen last time.
    fn on_version_change(&self, _previous: &str, _current: &str) {}
}

/// A presenter callback, as a value.
#[derive(Debug, Clone)]
pub enum Notification {
    ResultReady(Presentation),
    OriginalReady(Presentation),
    Error(Failure),
    Busy(bool),
    InputLoaded {
        filename: String,
        dimensions: Dimensions,
    },
    SettingsRestored(Settings),
    SettingsReset {
        previous: Settings,
    },
    VersionChanged {
        previous: String,
        current: String,
    },
}

/// Presenter forwarding every callback into a channel.
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelPresenter {
    /// Creates a presenter and the receiving end of its notifications.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, notification: Notification) {
        // Nobody listening is fine.
        let _ = self.tx.send(notification);
    }
}

impl Presenter for ChannelPresenter {
    fn on_result_ready(&self, presentation: &Presentation) {
        self.send(Notification::ResultReady(presentation.clone()));
    }

    fn on_original_ready(&self, presentation: &Presentation) {
        self.send(Notification::OriginalReady(presentation.clone()));
    }

    fn on_error(&self, failure: &Failure) {
        self.send(Notification::Error(failure.clone()));
    }

    fn on_busy(&self, busy: bool) {
        self.send(Notification::Busy(busy));
    }

    fn on_input_loaded(&self, filename: &str, dimensions: Dimensions) {
        self.send(Notification::InputLoaded {
            filename: filename.to_owned(),
            dimensions,
        });
    }

    fn on_settings_restored(&self, settings: &Settings) {
        self.send(Notification::SettingsRestored(settings.clone()));
    }

    fn on_settings_reset(&self, previous: &Settings) {
        self.send(Notification::SettingsReset {
            previous: previous.clone(),
        });
    }

    fn on_version_change(&self, previous: &str, current: &str) {
        self.send(Notification::VersionChanged {
            previous: previous.to_owned(),
            current: current.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presentation(size: usize, comparison_size: Option<usize>) -> Presentation {
        Presentation {
            value: ResultValue::new("<svg/>", Dimensions::default()),
            filename: "a.svg".into(),
            mode: CompressionMode::Plain,
            size,
            comparison_size,
        }
    }

    #[test]
    fn test_savings_percent() {
        assert_eq!(presentation(25, Some(100)).savings_percent(), Some(75.0));
        assert_eq!(presentation(25, None).savings_percent(), None);
        assert_eq!(presentation(0, Some(0)).savings_percent(), None);
    }

    #[test]
    fn test_channel_presenter_forwards_notifications() {
        let (presenter, mut rx) = ChannelPresenter::new();
        presenter.on_busy(true);
        presenter.on_version_change("1.0.0", "1.1.0");

        assert!(matches!(rx.try_recv(), Ok(Notification::Busy(true))));
        assert!(matches!(
            rx.try_recv(),
            Ok(Notification::VersionChanged { previous, .. }) if previous == "1.0.0"
        ));
    }
}
