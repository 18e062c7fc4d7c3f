//! Channel-fed focus observer.
//!
//! A [`FocusFeed`] pushes focus changes from whatever produces them (a test,
//! a scenario timeline, a UI bridge); the paired [`ChannelFocusObserver`]
//! drains them on each poll and reports the latest visible focus target.

use crate::probe::{ElementDescriptor, EnvironmentError, FocusObserver};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A change in visible focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusChange {
    /// Visible focus moved to this element
    Focus(ElementDescriptor),
    /// Nothing holds visible focus any more
    Blur,
    /// The next focus query fails with this message
    Fail(String),
}

/// Sending side of a focus channel.
#[derive(Debug, Clone)]
pub struct FocusFeed {
    sender: Sender<FocusChange>,
}

impl FocusFeed {
    /// Create a feed and the observer that reads it.
    pub fn new() -> (Self, ChannelFocusObserver) {
        let (sender, receiver) = unbounded();
        (
            Self { sender },
            ChannelFocusObserver {
                receiver,
                current: Mutex::new(None),
            },
        )
    }

    /// Push a change. Returns `false` once the observer is gone.
    pub fn push(&self, change: FocusChange) -> bool {
        self.sender.send(change).is_ok()
    }

    pub fn focus(&self, element: ElementDescriptor) -> bool {
        self.push(FocusChange::Focus(element))
    }

    pub fn blur(&self) -> bool {
        self.push(FocusChange::Blur)
    }

    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.push(FocusChange::Fail(message.into()))
    }
}

/// Reports the most recent focus change pushed to its feed.
#[derive(Debug)]
pub struct ChannelFocusObserver {
    receiver: Receiver<FocusChange>,
    current: Mutex<Option<ElementDescriptor>>,
}

impl FocusObserver for ChannelFocusObserver {
    fn current_visible_focus_target(&self) -> Result<Option<ElementDescriptor>, EnvironmentError> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());

        // A failure is reported on its own; anything queued after it waits
        // for the next poll.
        while let Ok(change) = self.receiver.try_recv() {
            match change {
                FocusChange::Focus(element) => *current = Some(element),
                FocusChange::Blur => *current = None,
                FocusChange::Fail(message) => return Err(EnvironmentError::new(message)),
            }
        }

        Ok(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::TagCategory;

    #[test]
    fn test_latest_change_wins() {
        let (feed, observer) = FocusFeed::new();
        assert_eq!(observer.current_visible_focus_target(), Ok(None));

        feed.focus(ElementDescriptor::new(TagCategory::Input));
        feed.focus(ElementDescriptor::new(TagCategory::Other));
        assert_eq!(
            observer.current_visible_focus_target(),
            Ok(Some(ElementDescriptor::new(TagCategory::Other)))
        );

        // Focus persists between polls until blurred
        assert!(observer.current_visible_focus_target().unwrap().is_some());
        feed.blur();
        assert_eq!(observer.current_visible_focus_target(), Ok(None));
    }

    #[test]
    fn test_failure_reported_once() {
        let (feed, observer) = FocusFeed::new();

        feed.fail("querySelector threw");
        feed.focus(ElementDescriptor::new(TagCategory::Other));

        assert!(observer.current_visible_focus_target().is_err());
        assert_eq!(
            observer.current_visible_focus_target(),
            Ok(Some(ElementDescriptor::new(TagCategory::Other)))
        );
    }

    #[test]
    fn test_push_after_observer_dropped() {
        let (feed, observer) = FocusFeed::new();
        drop(observer);
        assert!(!feed.blur());
    }
}
