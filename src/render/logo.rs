use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, Rgb, RgbImage};

/// What the header region will show: a usable logo bitmap, or the
/// first-letter avatar when there is no logo or it could not be loaded.
pub enum PreparedLogo {
    Image(DynamicImage),
    Initial(char),
}

/// Fetches and normalizes the company logo. Every failure path degrades to
/// the initials avatar; this function never blocks rendering with an error.
pub async fn prepare_logo(
    client: &reqwest::Client,
    logo_url: Option<&str>,
    initial: char,
    timeout_ms: u64,
    max_bytes: usize,
) -> PreparedLogo {
    let url = match logo_url {
        Some(url) => url,
        None => return PreparedLogo::Initial(initial),
    };

    let bytes = if url.starts_with("data:image/") {
        decode_data_url(url)
    } else {
        fetch_logo(client, url, timeout_ms, max_bytes).await
    };

    match bytes.and_then(|b| image::load_from_memory(&b).ok()) {
        Some(img) => PreparedLogo::Image(flatten_onto_white(&img)),
        None => {
            tracing::warn!(url, "logo could not be loaded, using avatar fallback");
            PreparedLogo::Initial(initial)
        }
    }
}

async fn fetch_logo(
    client: &reqwest::Client,
    url: &str,
    timeout_ms: u64,
    max_bytes: usize,
) -> Option<Vec<u8>> {
    let response = client
        .get(url)
        .timeout(Duration::from_millis(timeout_ms))
        .send()
        .await
        .ok()?
        .error_for_status()
        .ok()?;
    let bytes = response.bytes().await.ok()?;
    if bytes.len() > max_bytes {
        return None;
    }
    Some(bytes.to_vec())
}

fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let (_, payload) = url.split_once(";base64,")?;
    BASE64.decode(payload).ok()
}

/// Re-encodes the logo with alpha removed, compositing onto white. This
/// normalizes the format differences the original images arrive with.
fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let mut flat = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        flat.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    DynamicImage::ImageRgb8(flat)
}

/// PNG bytes for embedding the logo into the HTML preview as a data URL.
pub fn encode_png(img: &DynamicImage) -> Option<Vec<u8>> {
    let mut buffer = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut buffer),
        image::ImageOutputFormat::Png,
    )
    .ok()?;
    Some(buffer)
}

pub fn data_url(img: &DynamicImage) -> Option<String> {
    encode_png(img).map(|png| format!("data:image/png;base64,{}", BASE64.encode(png)))
}
