// Upload intake for the speech relay
//
// This module streams the `audio` part of a multipart request into a transient
// file, checking its declared media type and size while it is written.

use std::path::Path;

use actix_multipart::{Field, Multipart};
use futures::{StreamExt, TryStreamExt};
use log::{debug, error, info, warn};
use tokio::io::AsyncWriteExt;

use crate::config::HandlerConfig;
use crate::error::HandlerError;
use crate::file_utils::TransientUpload;
use crate::models::UploadedAudio;

/// Name of the multipart field carrying the audio file
pub const AUDIO_FIELD: &str = "audio";

/// Extract the uploaded audio from a multipart form
///
/// Unknown fields are drained and ignored. Any error after the transient file
/// was created drops the `TransientUpload`, which removes the partial file.
pub async fn extract_upload(
    mut form: Multipart,
    config: &HandlerConfig,
) -> Result<UploadedAudio, HandlerError> {
    config.ensure_upload_dir().map_err(|e| {
        error!("Failed to create upload directory {}: {}", config.upload_dir, e);
        HandlerError::UploadStorage(e)
    })?;
    let upload_dir = Path::new(&config.upload_dir);

    let mut audio: Option<UploadedAudio> = None;

    while let Some(mut field) = form
        .try_next()
        .await
        .map_err(|e| HandlerError::form_error(format!("malformed multipart body: {}", e)))?
    {
        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|name| name.to_string()))
            .unwrap_or_default();

        if field_name == AUDIO_FIELD {
            if audio.is_some() {
                return Err(HandlerError::DuplicateAudioField);
            }
            audio = Some(store_audio_field(&mut field, upload_dir, config.max_file_size).await?);
        } else {
            debug!("Skipping form field '{}'", field_name);
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| {
                    HandlerError::form_error(format!("Error reading field {}: {}", field_name, e))
                })?;
            }
        }
    }

    audio.ok_or(HandlerError::NoAudioFile)
}

async fn store_audio_field(
    field: &mut Field,
    upload_dir: &Path,
    max_file_size: usize,
) -> Result<UploadedAudio, HandlerError> {
    let content_type = match field.content_type() {
        Some(mime) if !is_accepted_media_type(mime.type_().as_str(), mime.essence_str()) => {
            return Err(HandlerError::UnsupportedMediaType(mime.to_string()));
        }
        Some(mime) => Some(mime.to_string()),
        None => None,
    };

    let (upload, mut file) = TransientUpload::create(upload_dir).await.map_err(|e| {
        error!("Failed to create transient file in {}: {}", upload_dir.display(), e);
        HandlerError::UploadStorage(e)
    })?;

    let mut size = 0;
    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| {
            HandlerError::form_error(format!("Error processing audio upload: {}", e))
        })?;

        size += data.len();
        if size > max_file_size {
            warn!(
                "Upload {} exceeds the {} byte limit, discarding",
                upload.id(),
                max_file_size
            );
            return Err(HandlerError::FileTooLarge(max_file_size));
        }

        file.write_all(&data)
            .await
            .map_err(HandlerError::UploadStorage)?;
    }
    file.flush().await.map_err(HandlerError::UploadStorage)?;

    if size == 0 {
        return Err(HandlerError::EmptyUpload);
    }

    info!("Saved audio upload {} ({} bytes)", upload.id(), size);
    Ok(UploadedAudio {
        upload,
        size,
        content_type,
    })
}

/// `audio/*` and `application/octet-stream` are accepted
fn is_accepted_media_type(top_level: &str, essence: &str) -> bool {
    top_level.eq_ignore_ascii_case("audio") || essence.eq_ignore_ascii_case("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_and_octet_stream_are_accepted() {
        assert!(is_accepted_media_type("audio", "audio/wav"));
        assert!(is_accepted_media_type("audio", "audio/l16"));
        assert!(is_accepted_media_type("application", "application/octet-stream"));
        assert!(!is_accepted_media_type("text", "text/plain"));
        assert!(!is_accepted_media_type("application", "application/json"));
    }
}
