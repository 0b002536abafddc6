use std::sync::{Arc, Mutex};

#[cfg(test)]
use mockall::automock;

use agora_types::events::{VisualAction, VisualEvent};

/// The whiteboard's command interface. The dispatcher never draws anything
/// itself; it only forwards.
#[cfg_attr(test, automock)]
pub trait WhiteboardSurface: Send + Sync {
    fn add_note(&self, text: &str, x: Option<i64>, y: Option<i64>);
    fn add_image(&self, src: &str, x: Option<i64>, y: Option<i64>);
    fn clear(&self);
}

#[derive(serde::Deserialize)]
struct NotePayload {
    text: String,
    #[serde(default)]
    x: Option<i64>,
    #[serde(default)]
    y: Option<i64>,
}

#[derive(serde::Deserialize)]
struct ImagePayload {
    #[serde(alias = "url")]
    src: String,
    #[serde(default)]
    x: Option<i64>,
    #[serde(default)]
    y: Option<i64>,
}

/// Forwards `visual` events, in arrival order, to whichever whiteboard
/// surface is currently attached.
///
/// Commands arriving while no surface is attached are dropped (the board may
/// not be mounted yet) and are never replayed later. Unknown actions and
/// malformed payloads are logged no-ops; nothing here can take the session
/// down.
#[derive(Default)]
pub struct VisualDispatcher {
    surface: Mutex<Option<Arc<dyn WhiteboardSurface>>>,
}

impl VisualDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, surface: Arc<dyn WhiteboardSurface>) {
        *self.lock() = Some(surface);
    }

    pub fn detach(&self) {
        self.lock().take();
    }

    pub fn dispatch(&self, event: &VisualEvent) {
        let surface = self.lock().clone();
        let Some(surface) = surface else {
            tracing::debug!(
                "visual command dropped, no whiteboard attached: {:?}",
                event.action()
            );
            return;
        };

        match event.action() {
            VisualAction::CreateNote => {
                match serde_json::from_value::<NotePayload>(event.payload().clone()) {
                    Ok(note) => surface.add_note(&note.text, note.x, note.y),
                    Err(e) => tracing::warn!("malformed note payload: {}", e),
                }
            }
            VisualAction::LoadImage => {
                match serde_json::from_value::<ImagePayload>(event.payload().clone()) {
                    Ok(image) => surface.add_image(&image.src, image.x, image.y),
                    Err(e) => tracing::warn!("malformed image payload: {}", e),
                }
            }
            VisualAction::ClearBoard => surface.clear(),
            VisualAction::Other(action) => {
                tracing::debug!("ignoring unknown visual action: {}", action);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn WhiteboardSurface>>> {
        self.surface
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
