use tracing::debug;

/// Best-effort copy to the system clipboard. Having no clipboard (e.g. a
/// headless session) is not an error.
pub fn copy(text: &str) {
    let result = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text));
    match result {
        Ok(()) => debug!("copied {} bytes to the clipboard", text.len()),
        Err(err) => debug!("clipboard unavailable: {}", err),
    }
}
