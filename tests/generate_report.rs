use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use photo_report_rust::{
    FontSet, PhotoEntry, ReportError, ReportRequest, Settings, ValidationError, generate_report,
};
use std::path::Path;
use tempfile::tempdir;

fn png_data_uri(width: u32, height: u32) -> String {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 180]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    format!("data:image/png;base64,{}", BASE64.encode(bytes))
}

fn request(photos: usize) -> ReportRequest {
    ReportRequest {
        title: Some("Relatório de Auditoria".to_string()),
        location: Some("Estação José Bonifácio".to_string()),
        system_ref: Some("SA".to_string()),
        date: Some("12/01/2026".to_string()),
        issuer: None,
        photos: (0..photos)
            .map(|index| PhotoEntry {
                image: png_data_uri(8, 6),
                caption: Some(format!("Ponto de inspeção {}", index + 1)),
            })
            .collect(),
    }
}

fn settings_in(root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.paths.logo = root.join("assets").join("logo.png");
    settings.paths.uploads_dir = root.join("temp_uploads");
    settings.paths.assets_dir = root.join("assets");
    settings
}

#[test]
fn single_photo_produces_one_page() {
    let dir = tempdir().expect("tempdir");
    let report = generate_report(&request(1), &settings_in(dir.path()), &FontSet::default())
        .expect("generate");
    assert!(report.pdf.starts_with(b"%PDF"));
    assert_eq!(report.pages, 1);
    assert_eq!(report.embedded, 1);
    assert_eq!(report.skipped, 0);
}

#[test]
fn fifty_photos_are_accepted() {
    let dir = tempdir().expect("tempdir");
    let report = generate_report(&request(50), &settings_in(dir.path()), &FontSet::default())
        .expect("generate");
    assert_eq!(report.embedded, 50);
    assert_eq!(report.pages, 25);
}

#[test]
fn fifty_one_photos_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let err = generate_report(&request(51), &settings_in(dir.path()), &FontSet::default())
        .expect_err("should reject");
    match err {
        ReportError::Validation(err) => {
            assert_eq!(err, ValidationError::TooManyPhotos { max: 50 });
            assert_eq!(err.to_string(), "Máximo de 50 fotos por relatório");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn corrupt_photo_still_renders_the_document() {
    let dir = tempdir().expect("tempdir");
    let mut request = request(0);
    request.photos.push(PhotoEntry {
        image: "data:image/jpeg;base64,bm90IGFuIGltYWdl".to_string(),
        caption: Some("quebrada".to_string()),
    });
    let report = generate_report(&request, &settings_in(dir.path()), &FontSet::default())
        .expect("generate");
    assert!(report.pdf.starts_with(b"%PDF"));
    assert_eq!(report.embedded, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.pages, 1);
}

#[test]
fn logo_on_disk_is_used() {
    let dir = tempdir().expect("tempdir");
    let settings = settings_in(dir.path());
    std::fs::create_dir_all(&settings.paths.assets_dir).expect("assets dir");
    image::RgbImage::from_pixel(30, 30, image::Rgb([30, 91, 168]))
        .save(&settings.paths.logo)
        .expect("save logo");
    let report =
        generate_report(&request(3), &settings, &FontSet::default()).expect("generate");
    assert_eq!(report.pages, 2);
}
