use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;

use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use roomcraft_contracts::design::{ColorSwatch, EncodedImage, ExtractedItem, ExtractionPayload};
use sha2::{Digest, Sha256};

use super::{RemoteBackend, RemoteRequest};
use crate::error::{FailureKind, GatewayError};

const FALLBACK_SIZE: (u32, u32) = (512, 384);

const CANNED_ITEMS: &[(&str, &str)] = &[
    ("Accent Chair", "Oatmeal boucle"),
    ("Coffee Table", "Natural oak"),
    ("Floor Lamp", "Brushed brass"),
    ("Throw Pillows", "Sage linen"),
    ("Area Rug", "Cream wool"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedCall {
    Transform,
    Extract,
}

/// Offline backend. Transforms return a solid image whose color is derived
/// from the prompt; extraction returns a fixed shopping list.
#[derive(Default)]
pub struct DryrunBackend {
    failures: Mutex<VecDeque<(ScriptedCall, GatewayError)>>,
}

impl DryrunBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `err` for the next matching call.
    pub fn fail_next(&self, call: ScriptedCall, err: GatewayError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back((call, err));
        }
    }

    fn take_failure(&self, call: ScriptedCall) -> Option<GatewayError> {
        let mut failures = self.failures.lock().ok()?;
        let idx = failures.iter().position(|(kind, _)| *kind == call)?;
        failures.remove(idx).map(|(_, err)| err)
    }
}

impl RemoteBackend for DryrunBackend {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn transform(&self, request: &RemoteRequest) -> Result<EncodedImage, GatewayError> {
        if let Some(err) = self.take_failure(ScriptedCall::Transform) {
            return Err(err);
        }
        let (width, height) = ImageReader::new(Cursor::new(&request.image.bytes))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok())
            .unwrap_or(FALLBACK_SIZE);
        let digest = prompt_digest(&request.prompt);
        let image = RgbImage::from_pixel(width, height, Rgb([digest[0], digest[1], digest[2]]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|err| {
                GatewayError::new(FailureKind::Other, format!("dryrun encode failed: {err}"))
            })?;
        Ok(EncodedImage::new(bytes, "image/png"))
    }

    fn extract(&self, request: &RemoteRequest) -> Result<ExtractionPayload, GatewayError> {
        if let Some(err) = self.take_failure(ScriptedCall::Extract) {
            return Err(err);
        }
        let digest = prompt_digest(&request.prompt);
        let furniture = CANNED_ITEMS
            .iter()
            .map(|(name, color)| ExtractedItem {
                item_name: name.to_string(),
                color: color.to_string(),
                search_query: format!("{color} {name} buy online"),
            })
            .collect();
        let palette = digest
            .chunks(3)
            .take(5)
            .enumerate()
            .map(|(idx, rgb)| {
                ColorSwatch::new(
                    format!("#{}", hex::encode_upper(rgb)),
                    format!("Dryrun Tone {}", idx + 1),
                )
            })
            .collect();
        Ok(ExtractionPayload { furniture, palette })
    }
}

fn prompt_digest(prompt: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.finalize().to_vec()
}
