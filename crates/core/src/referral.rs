//! Referral artifacts.
//!
//! A referral is what the patient shows at the lab: a Telegram deep link that opens the bot with
//! the order code pre-filled, plus the same link rendered as a scannable QR image. Both are
//! derived once from the order code at creation and never change afterwards.
//!
//! Image encoding sits behind [`ImageEncoder`] so the builder stays a pure function of its
//! inputs; [`QrPngEncoder`] is the production encoder.

use crate::constants::TELEGRAM_DEEP_LINK_BASE;
use crate::{OrderError, OrderResult};
use allergo_types::OrderCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;

/// Deep link plus its inline image encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralArtifact {
    /// `https://t.me/<bot>?text=<code>`
    pub telegram_url: String,
    /// `data:<mime>;base64,<image bytes>`
    pub qr_data_url: String,
}

/// Pure `text → image bytes` encoding.
pub trait ImageEncoder: Send + Sync {
    /// MIME type of the bytes returned by [`encode`](Self::encode).
    fn mime_type(&self) -> &'static str;

    /// Encodes `text` into an image.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the text cannot be encoded (for example because it
    /// exceeds the image's capacity).
    fn encode(&self, text: &str) -> Result<Vec<u8>, String>;
}

/// QR code rendered as a greyscale PNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct QrPngEncoder;

impl ImageEncoder for QrPngEncoder {
    fn mime_type(&self) -> &'static str {
        "image/png"
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, String> {
        let code = QrCode::new(text.as_bytes()).map_err(|e| e.to_string())?;
        let img = code.render::<Luma<u8>>().build();

        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| e.to_string())?;
        Ok(bytes)
    }
}

/// Builds referral artifacts for a fixed bot identity.
#[derive(Clone)]
pub struct ReferralBuilder {
    bot_username: String,
    encoder: Arc<dyn ImageEncoder>,
}

impl ReferralBuilder {
    pub fn new(bot_username: impl Into<String>, encoder: Arc<dyn ImageEncoder>) -> Self {
        Self {
            bot_username: bot_username.into(),
            encoder,
        }
    }

    /// The deep link for `code`.
    pub fn telegram_url(&self, code: &OrderCode) -> String {
        format!(
            "{TELEGRAM_DEEP_LINK_BASE}/{}?text={}",
            self.bot_username, code
        )
    }

    /// Builds the deep link and its image for `code`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Encoding`] if the encoder rejects the link.
    pub fn build(&self, code: &OrderCode) -> OrderResult<ReferralArtifact> {
        let telegram_url = self.telegram_url(code);
        let bytes = self
            .encoder
            .encode(&telegram_url)
            .map_err(OrderError::Encoding)?;

        Ok(ReferralArtifact {
            qr_data_url: format!(
                "data:{};base64,{}",
                self.encoder.mime_type(),
                STANDARD.encode(bytes)
            ),
            telegram_url,
        })
    }
}

impl std::fmt::Debug for ReferralBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferralBuilder")
            .field("bot_username", &self.bot_username)
            .field("mime_type", &self.encoder.mime_type())
            .finish()
    }
}
