//! Activation events via NSWorkspace notifications.
//!
//! Registers a block observer for `NSWorkspaceDidActivateApplicationNotification`
//! on a serial NSOperationQueue, so callbacks arrive one at a time and only
//! when the foreground app actually changes. By the time the block runs the
//! activated app is frontmost, so the event payload is read from
//! `NSWorkspace.frontmostApplication`.

use std::ptr::NonNull;
use std::sync::Mutex;

use anyhow::Result;
use block2::RcBlock;
use log::{debug, error, info, warn};
use objc2::rc::Retained;
use objc2::runtime::{NSObjectProtocol, ProtocolObject};
use objc2_app_kit::NSWorkspace;
use objc2_foundation::{NSNotification, NSNotificationCenter, NSOperationQueue, NSString};

use super::types::{ActivationCallback, ActivationEvent, ActivationSource};

type ObserverToken = Retained<ProtocolObject<dyn NSObjectProtocol>>;
type NotificationBlock = RcBlock<dyn Fn(NonNull<NSNotification>)>;

/// Resources owned while an observer is installed. Teardown order matters:
/// the observer must be removed before the block is released, otherwise the
/// notification center can call into freed memory.
struct ObserverState {
    nc: Retained<NSNotificationCenter>,
    token: ObserverToken,
    queue: Retained<NSOperationQueue>,
    block: NotificationBlock,
}

/// [`ActivationSource`] backed by the shared NSWorkspace notification
/// center.
pub struct WorkspaceActivationSource {
    state: Mutex<Option<ObserverState>>,
}

// SAFETY: all Objective-C objects are held as `Retained` (thread-safe
// reference counting), NSNotificationCenter observer add/remove is
// documented thread-safe, and the block only captures Send + Sync Rust
// values. The Option is guarded by the Mutex.
unsafe impl Send for WorkspaceActivationSource {}
unsafe impl Sync for WorkspaceActivationSource {}

impl WorkspaceActivationSource {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    fn teardown(state: ObserverState) {
        unsafe {
            // SAFETY: ProtocolObject<dyn NSObjectProtocol> is
            // repr(transparent) over AnyObject, and removeObserver only
            // needs an AnyObject reference.
            let observer_ref = std::mem::transmute::<
                &ProtocolObject<dyn NSObjectProtocol>,
                &objc2::runtime::AnyObject,
            >(&*state.token);
            state.nc.removeObserver(observer_ref);
        }
        // Block and queue drop after the observer is gone.
        drop(state.block);
        drop(state.queue);
        debug!("workspace observer removed");
    }
}

impl Default for WorkspaceActivationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivationSource for WorkspaceActivationSource {
    fn subscribe(&self, on_event: ActivationCallback) -> Result<()> {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.is_some() {
            debug!("workspace observer already installed, ignoring subscribe");
            return Ok(());
        }

        let state = unsafe {
            let workspace = NSWorkspace::sharedWorkspace();
            let nc = workspace.notificationCenter();

            // Serial queue keeps callback ordering deterministic.
            let queue = NSOperationQueue::new();
            queue.setMaxConcurrentOperationCount(1);

            let block = RcBlock::new(move |_note: NonNull<NSNotification>| {
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    if let Some(event) = frontmost_event() {
                        on_event(event);
                    }
                }));
                if outcome.is_err() {
                    error!("workspace observer callback panicked");
                }
            });
            // Heap-allocate so the notification center can retain it.
            let block = block.copy();

            let notification_name =
                NSString::from_str("NSWorkspaceDidActivateApplicationNotification");
            let token = nc.addObserverForName_object_queue_usingBlock(
                Some(&notification_name),
                None,
                Some(&queue),
                &block,
            );

            ObserverState {
                nc,
                token,
                queue,
                block,
            }
        };

        *guard = Some(state);
        info!("workspace observer registered");
        Ok(())
    }

    fn unsubscribe(&self) {
        let taken = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(state) = taken {
            Self::teardown(state);
        }
    }
}

impl Drop for WorkspaceActivationSource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn frontmost_event() -> Option<ActivationEvent> {
    unsafe {
        let workspace = NSWorkspace::sharedWorkspace();
        let app = workspace.frontmostApplication()?;
        let Some(bundle_id) = app.bundleIdentifier() else {
            // Menu bar, Dock and other system surfaces have no bundle id.
            warn!("frontmost application has no bundle identifier, skipping");
            return None;
        };
        let bundle_id = bundle_id.to_string();
        let display_name = app
            .localizedName()
            .map(|name| name.to_string())
            .unwrap_or_else(|| bundle_id.clone());

        Some(ActivationEvent {
            pid: app.processIdentifier(),
            bundle_id,
            display_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn subscribe_and_unsubscribe_are_idempotent() {
        let source = WorkspaceActivationSource::new();
        let callback: ActivationCallback = Arc::new(|_| {});

        source.subscribe(Arc::clone(&callback)).unwrap();
        // Second subscribe must not install a second observer.
        source.subscribe(callback).unwrap();

        source.unsubscribe();
        source.unsubscribe();
    }
}
