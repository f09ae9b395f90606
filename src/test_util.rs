#[cfg(test)]
pub(crate) fn png_data_uri(width: u32, height: u32) -> String {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;

    let image = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 40 % 255) as u8, (y * 60 % 255) as u8, 128])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    format!("data:image/png;base64,{}", BASE64.encode(bytes))
}

#[cfg(test)]
pub(crate) fn request_with_photos(count: usize) -> crate::report::ReportRequest {
    crate::report::ReportRequest {
        title: Some("Audit Report".to_string()),
        location: Some("Plant 4".to_string()),
        system_ref: Some("SA".to_string()),
        date: Some("12/01/2026".to_string()),
        issuer: Some("Trivia Trens".to_string()),
        photos: (0..count)
            .map(|index| crate::report::PhotoEntry {
                image: png_data_uri(4, 3),
                caption: Some(format!("Observation {}", index + 1)),
            })
            .collect(),
    }
}
