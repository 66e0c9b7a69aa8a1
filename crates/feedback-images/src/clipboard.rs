use tracing::debug;

use crate::{CapturedImage, ImageError, ImageLoader, ImageSource};

impl ImageLoader {
    /// Capture the image currently on the system clipboard.
    ///
    /// A clipboard without image data yields [`ImageError::ClipboardEmpty`],
    /// which callers should present as information rather than a failure.
    pub fn load_from_clipboard(&self) -> Result<CapturedImage, ImageError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| ImageError::ClipboardUnavailable(e.to_string()))?;

        let data = match clipboard.get_image() {
            Ok(data) => data,
            Err(arboard::Error::ContentNotAvailable) => {
                debug!("Clipboard holds no image data");
                return Err(ImageError::ClipboardEmpty);
            }
            Err(e) => return Err(ImageError::ClipboardUnavailable(e.to_string())),
        };

        self.load_from_rgba(
            data.width,
            data.height,
            data.bytes.into_owned(),
            ImageSource::Clipboard,
        )
    }
}
